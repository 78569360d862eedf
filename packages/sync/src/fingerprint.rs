//! Content fingerprinting.
//!
//! The fingerprint is the MD5 hex digest of a file's original,
//! untransformed bytes. It is computed before any gzip transform and
//! stored as remote metadata, so change detection is transform-agnostic:
//! re-running with a different gzip setting never fights with previous
//! uploads' metadata.

use std::path::Path;

/// Computes the MD5 hex digest of a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub async fn fingerprint(path: &Path) -> Result<String, std::io::Error> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || fingerprint_sync(&path))
        .await
        .map_err(std::io::Error::other)?
}

/// Synchronous MD5 computation (runs in a blocking thread).
pub fn fingerprint_sync(path: &Path) -> Result<String, std::io::Error> {
    use std::io::Read;

    let mut file = std::fs::File::open(path)?;
    let mut context = md5::Context::new();
    let mut buffer = vec![0u8; 256 * 1024]; // 256 KB chunks
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        context.consume(&buffer[..n]);
    }
    Ok(format!("{:x}", context.finalize()))
}

/// MD5 hex digest of in-memory bytes, for tests and small payloads.
#[must_use]
pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn digest_matches_known_vector() {
        // RFC 1321 test vector.
        assert_eq!(fingerprint_bytes(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[tokio::test]
    async fn file_digest_matches_bytes_digest() {
        let path = std::env::temp_dir().join("sitesync_fingerprint_test.txt");
        fs::write(&path, b"hello world").unwrap();

        let from_file = fingerprint(&path).await.unwrap();
        assert_eq!(from_file, fingerprint_bytes(b"hello world"));
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        assert!(
            fingerprint(Path::new("/nonexistent/sitesync.txt"))
                .await
                .is_err()
        );
    }
}
