#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The object-store seam for sitesync.
//!
//! [`ObjectStore`] is the narrow interface the sync engine needs: point
//! metadata lookup (where "not found" is a normal outcome, not an error),
//! bulk key listing for orphan detection, idempotent puts, and deletes.
//!
//! [`S3Store`] implements it against any S3-compatible endpoint;
//! [`MemoryStore`] backs the test suites.

mod memory;
mod s3;

use async_trait::async_trait;
use sitesync_models::{AclPolicy, ObjectHeaders, RemoteMetadata};

pub use crate::memory::MemoryStore;
pub use crate::s3::S3Store;

/// Custom metadata field that carries a file's content fingerprint.
///
/// Written on every upload and read back on subsequent runs to decide
/// Upload vs Skip without fetching object bodies.
pub const FINGERPRINT_METADATA_KEY: &str = "sitesync-hash";

/// Errors raised by object-store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Put failed.
    #[error("failed to upload s3://{bucket}/{key}: {source}")]
    Upload {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
        /// Underlying error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Metadata lookup failed (for reasons other than the object not
    /// existing).
    #[error("failed to head s3://{bucket}/{key}: {source}")]
    Head {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
        /// Underlying error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Delete failed.
    #[error("failed to delete s3://{bucket}/{key}: {source}")]
    Delete {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
        /// Underlying error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Listing failed.
    #[error("failed to list s3://{bucket}/{prefix}: {source}")]
    List {
        /// Bucket name.
        bucket: String,
        /// Key prefix.
        prefix: String,
        /// Underlying error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The bucket could not be reached with the given credentials.
    #[error("bucket \"{bucket}\" could not be retrieved with the specified credentials")]
    BucketAccess {
        /// Bucket name.
        bucket: String,
    },

    /// Local I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The object-store operations the sync engine depends on.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Point lookup: existence and stored fingerprint metadata for a key.
    ///
    /// Returns `Ok(None)` when the object does not exist; that is a normal
    /// outcome, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Head`] on lookup failures other than
    /// "not found".
    async fn head(&self, key: &str) -> Result<Option<RemoteMetadata>, StoreError>;

    /// Bulk listing: every existing key under `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::List`] on failure.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Writes an object. Idempotent at the key level: re-putting a key
    /// replaces its content.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Upload`] on failure.
    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        headers: &ObjectHeaders,
        fingerprint: &str,
        acl: AclPolicy,
    ) -> Result<(), StoreError>;

    /// Removes an object. Deleting a nonexistent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Delete`] on failure.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Preflight check that the bucket is reachable with the configured
    /// credentials. Run before any scan so that access failures abort
    /// before any remote mutation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BucketAccess`] when it is not.
    async fn verify_access(&self) -> Result<(), StoreError>;
}
