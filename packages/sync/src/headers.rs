//! Header and metadata policy for uploads.
//!
//! Content-Type comes from the original file's guessed mimetype (never the
//! `.gz` artifact), with a `;charset=` suffix for text types when one is
//! configured. Cache-Control is looked up by full mimetype in the
//! environment's cache map.

use std::path::Path;

use sitesync_models::{ObjectHeaders, SyncConfig};

/// Computes the headers for one upload.
#[must_use]
pub fn upload_headers(path: &Path, gzip_encoded: bool, config: &SyncConfig) -> ObjectHeaders {
    let mime = mime_guess::from_path(path).first();

    let content_type = mime.as_ref().map(|mime| {
        match &config.charset {
            Some(charset) if mime.type_() == mime_guess::mime::TEXT => {
                format!("{mime};charset={charset}")
            }
            _ => mime.to_string(),
        }
    });

    let cache_control = mime
        .as_ref()
        .and_then(|mime| config.cache.get(mime.essence_str()))
        .map(|secs| format!("max-age={secs}, public"));

    ObjectHeaders {
        content_type,
        content_encoding: gzip_encoded.then(|| "gzip".to_string()),
        cache_control,
    }
}
