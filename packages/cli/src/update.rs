//! Background update check.
//!
//! At most once per day, asks the crates.io API whether a newer sitesync
//! has been published and logs an alert if so. Strictly best-effort: every
//! failure (network, parse, filesystem) is swallowed, and the task never
//! affects the run's exit status.

use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current version, from the crate metadata.
const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// How long to wait between checks.
const CHECK_INTERVAL: Duration = Duration::from_secs(86_400);

/// crates.io metadata endpoint for this tool.
const REGISTRY_URL: &str = "https://crates.io/api/v1/crates/sitesync";

/// Spawns the check as a detached background task.
pub fn spawn_check() {
    tokio::spawn(async {
        if let Err(e) = check().await {
            log::debug!("update check skipped: {e}");
        }
    });
}

async fn check() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let Some(stamp) = stamp_path() else {
        return Ok(());
    };

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    if now.saturating_sub(last_checked(&stamp)) < CHECK_INTERVAL.as_secs() {
        return Ok(());
    }

    // Record the attempt up front so a failing endpoint is not retried on
    // every run.
    tokio::fs::write(&stamp, now.to_string()).await?;

    let client = reqwest::Client::builder()
        .user_agent(format!("sitesync/{CURRENT_VERSION}"))
        .timeout(Duration::from_secs(10))
        .build()?;

    let body: serde_json::Value = client.get(REGISTRY_URL).send().await?.json().await?;
    let Some(newest) = body
        .get("crate")
        .and_then(|c| c.get("max_stable_version"))
        .and_then(serde_json::Value::as_str)
    else {
        return Ok(());
    };

    if is_newer(newest, CURRENT_VERSION) {
        log::warn!(
            "There has been an update for sitesync. Version {newest} is now available (you have {CURRENT_VERSION})."
        );
    }

    Ok(())
}

fn stamp_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".sitesync-update-check"))
}

fn last_checked(stamp: &std::path::Path) -> u64 {
    std::fs::read_to_string(stamp)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(0)
}

/// Dotted-numeric version comparison; non-numeric segments compare as 0.
fn is_newer(candidate: &str, current: &str) -> bool {
    let parse = |v: &str| -> Vec<u64> {
        v.split('.')
            .map(|part| part.parse().unwrap_or(0))
            .collect()
    };
    parse(candidate) > parse(current)
}
