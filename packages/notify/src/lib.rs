#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Notification sink capability.
//!
//! Run summaries are forwarded as `(environment, message)` pairs. The
//! original tool delivered these to the macOS notification center when
//! available; here delivery is a capability behind [`NotificationSink`]
//! with a log-backed default, so environments without a desktop get the
//! summary on the console and nothing else changes.

use std::sync::Mutex;

/// Receives `(environment label, message)` pairs at the end of a run.
pub trait NotificationSink: Send + Sync {
    /// Delivers one summary message for one environment.
    fn notify(&self, environment: &str, message: &str);
}

/// Default sink: writes summaries to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, environment: &str, message: &str) {
        log::info!("[{environment}] {message}");
    }
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&self, _environment: &str, _message: &str) {}
}

/// Sink that records every message, for tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far, in order.
    #[must_use]
    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, environment: &str, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((environment.to_string(), message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_preserves_order() {
        let sink = RecordingSink::new();
        sink.notify("default", "3 files were updated");
        sink.notify("default", "1 files were removed");

        let messages = sink.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].1, "3 files were updated");
        assert_eq!(messages[1].1, "1 files were removed");
    }
}
