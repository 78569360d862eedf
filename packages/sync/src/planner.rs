//! The decision core.
//!
//! For each local file the planner fetches remote state once and decides
//! Upload or Skip; for each remote key with no corresponding local file it
//! plans a candidate deletion. Both passes produce a fully materialized
//! [`SyncPlan`] before any mutating call, so a dry-run is byte-identical
//! in logic to a real run up to the final mutation.

use std::collections::BTreeSet;

use sitesync_models::{LocalFileRecord, PlanEntry, PlanReason, SyncAction, SyncPlan};
use sitesync_store::{ObjectStore, StoreError};

/// Plans the upload pass: one entry per local file, in scan order.
///
/// Per-file state is a pure lookup — remote metadata is fetched once per
/// key, never polled:
///
/// - no remote object → Upload (new)
/// - remote fingerprint differs → Upload (changed)
/// - remote fingerprint matches → Skip, or Upload (forced) under `force`
///
/// # Errors
///
/// Returns [`StoreError`] if a metadata lookup fails. "Object not found"
/// is a normal outcome and never an error.
pub async fn plan_uploads(
    files: &[LocalFileRecord],
    store: &dyn ObjectStore,
    force: bool,
) -> Result<SyncPlan, StoreError> {
    let mut plan = SyncPlan::new();

    for file in files {
        let remote = store.head(&file.key).await?;

        let (action, reason) = match remote {
            None => (SyncAction::Upload, PlanReason::New),
            Some(meta) => {
                if meta.fingerprint.as_deref() == Some(file.fingerprint.as_str()) {
                    if force {
                        (SyncAction::Upload, PlanReason::Forced)
                    } else {
                        (SyncAction::Skip, PlanReason::Unchanged)
                    }
                } else {
                    // Also covers objects uploaded out-of-band that carry
                    // no fingerprint metadata at all.
                    (SyncAction::Upload, PlanReason::Changed)
                }
            }
        };

        plan.push(PlanEntry {
            key: file.key.clone(),
            action,
            reason,
        });
    }

    Ok(plan)
}

/// The keep set: every remote key claimed by the current local
/// enumeration.
///
/// Must be built from a *complete* scan — a partial keep set would mark
/// live objects as orphans.
#[must_use]
pub fn keep_set(files: &[LocalFileRecord]) -> BTreeSet<String> {
    files.iter().map(|file| file.key.clone()).collect()
}

/// Plans the delete pass: one candidate per remote key not in the keep
/// set, in sorted key order (so confirmation prompts are deterministic).
#[must_use]
pub fn plan_deletes(remote_keys: &[String], keep: &BTreeSet<String>) -> SyncPlan {
    let mut orphans: Vec<&String> = remote_keys
        .iter()
        .filter(|key| !keep.contains(*key))
        .collect();
    orphans.sort();
    orphans.dedup();

    let mut plan = SyncPlan::new();
    for key in orphans {
        plan.push(PlanEntry {
            key: key.clone(),
            action: SyncAction::Delete,
            reason: PlanReason::Orphaned,
        });
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use sitesync_store::MemoryStore;

    fn record(key: &str, fingerprint: &str) -> LocalFileRecord {
        LocalFileRecord {
            path: PathBuf::from(key),
            key: key.to_string(),
            fingerprint: fingerprint.to_string(),
            size: 0,
        }
    }

    #[tokio::test]
    async fn new_changed_and_unchanged_files() {
        let store = MemoryStore::new();
        store.seed("index.html", b"old", "matching");
        store.seed("style.css", b"old", "stale");

        let files = vec![
            record("index.html", "matching"),
            record("style.css", "fresh"),
            record("app.js", "anything"),
        ];

        let plan = plan_uploads(&files, &store, false).await.unwrap();
        let entries = plan.entries();

        assert_eq!(entries[0].action, SyncAction::Skip);
        assert_eq!(entries[0].reason, PlanReason::Unchanged);
        assert_eq!(entries[1].action, SyncAction::Upload);
        assert_eq!(entries[1].reason, PlanReason::Changed);
        assert_eq!(entries[2].action, SyncAction::Upload);
        assert_eq!(entries[2].reason, PlanReason::New);
    }

    #[tokio::test]
    async fn force_uploads_everything() {
        let store = MemoryStore::new();
        store.seed("index.html", b"old", "matching");

        let files = vec![record("index.html", "matching"), record("app.js", "f")];
        let plan = plan_uploads(&files, &store, true).await.unwrap();

        assert_eq!(plan.count(SyncAction::Upload), 2);
        assert_eq!(plan.entries()[0].reason, PlanReason::Forced);
        assert_eq!(plan.entries()[1].reason, PlanReason::New);
    }

    #[tokio::test]
    async fn skip_requires_exact_fingerprint_match() {
        let store = MemoryStore::new();
        store.seed("a", b"x", "fp-1");

        let files = vec![record("a", "fp-1")];
        let plan = plan_uploads(&files, &store, false).await.unwrap();
        assert_eq!(plan.count(SyncAction::Skip), 1);

        let files = vec![record("a", "fp-2")];
        let plan = plan_uploads(&files, &store, false).await.unwrap();
        assert_eq!(plan.count(SyncAction::Upload), 1);
    }

    #[test]
    fn orphans_are_remote_keys_outside_the_keep_set() {
        let files = vec![record("a.png", "1"), record("new.js", "2")];
        let keep = keep_set(&files);

        let remote = vec!["a.png".to_string(), "old.js".to_string()];
        let plan = plan_deletes(&remote, &keep);

        assert_eq!(plan.entries().len(), 1);
        assert_eq!(plan.entries()[0].key, "old.js");
        assert_eq!(plan.entries()[0].action, SyncAction::Delete);
        assert_eq!(plan.entries()[0].reason, PlanReason::Orphaned);
    }

    #[test]
    fn empty_remote_listing_plans_no_deletes() {
        let keep = keep_set(&[record("a", "1")]);
        assert!(plan_deletes(&[], &keep).entries().is_empty());
    }

    #[test]
    fn delete_candidates_are_sorted() {
        let keep = BTreeSet::new();
        let remote = vec!["z".to_string(), "a".to_string(), "m".to_string()];
        let plan = plan_deletes(&remote, &keep);
        let keys: Vec<&str> = plan.entries().iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "m", "z"]);
    }
}
