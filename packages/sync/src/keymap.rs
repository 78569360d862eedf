//! Local path → remote key translation.
//!
//! A pure, total function of path + config: both the upload pass and the
//! delete reconciliation recompute keys with it, so the same inputs must
//! always yield the same key.

use std::path::Path;

/// Derives the remote key for a local path.
///
/// Strips the local root prefix from the path, strips any leading slash
/// from the remainder, strips the trailing slash from the bucket prefix,
/// joins with exactly one slash, and strips any leading slash from the
/// result.
#[must_use]
pub fn remote_key(path: &Path, local_root: &Path, bucket_path: &str) -> String {
    let relative = path.strip_prefix(local_root).unwrap_or(path);
    let relative = relative.to_string_lossy();
    let relative = relative.trim_start_matches('/');

    let prefix = bucket_path.trim_end_matches('/');

    let key = format!("{prefix}/{relative}");
    key.trim_start_matches('/').to_string()
}

/// The listing prefix corresponding to a bucket path, for orphan
/// detection. Matches the key normalization above.
#[must_use]
pub fn listing_prefix(bucket_path: &str) -> String {
    bucket_path.trim_start_matches('/').to_string()
}
