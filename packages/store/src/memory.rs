//! In-memory [`ObjectStore`] used by the test suites.
//!
//! Tracks every mutating call so tests can assert that dry-run performs
//! none of them.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sitesync_models::{AclPolicy, ObjectHeaders, RemoteMetadata};

use crate::{ObjectStore, StoreError};

/// One stored object.
#[derive(Debug, Clone)]
pub struct MemoryObject {
    /// Object bytes as uploaded (post-transform).
    pub body: Vec<u8>,
    /// Fingerprint metadata written with the object.
    pub fingerprint: String,
    /// Headers written with the object.
    pub headers: ObjectHeaders,
    /// ACL the object was written with.
    pub acl: AclPolicy,
}

/// [`ObjectStore`] backed by a `BTreeMap`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, MemoryObject>>,
    mutations: Mutex<u64>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an object as if a previous run had uploaded it.
    pub fn seed(&self, key: &str, body: &[u8], fingerprint: &str) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            MemoryObject {
                body: body.to_vec(),
                fingerprint: fingerprint.to_string(),
                headers: ObjectHeaders::default(),
                acl: AclPolicy::default(),
            },
        );
    }

    /// A snapshot of one stored object.
    #[must_use]
    pub fn object(&self, key: &str) -> Option<MemoryObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    /// All stored keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    /// Number of mutating calls (`put` + `delete`) made so far.
    #[must_use]
    pub fn mutation_count(&self) -> u64 {
        *self.mutations.lock().unwrap()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn head(&self, key: &str) -> Result<Option<RemoteMetadata>, StoreError> {
        Ok(self.objects.lock().unwrap().get(key).map(|obj| {
            RemoteMetadata {
                fingerprint: Some(obj.fingerprint.clone()),
                size: Some(obj.body.len() as u64),
            }
        }))
    }

    #[allow(clippy::significant_drop_tightening)]
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        headers: &ObjectHeaders,
        fingerprint: &str,
        acl: AclPolicy,
    ) -> Result<(), StoreError> {
        *self.mutations.lock().unwrap() += 1;
        self.objects.lock().unwrap().insert(
            key.to_string(),
            MemoryObject {
                body,
                fingerprint: fingerprint.to_string(),
                headers: headers.clone(),
                acl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        *self.mutations.lock().unwrap() += 1;
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn verify_access(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
