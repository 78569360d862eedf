#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The sitesync decision engine.
//!
//! One run is a pipeline of pure stages over the same immutable
//! [`SyncConfig`]: scan → exclude → {fingerprint, key-map} → plan →
//! transform → upload, then a second, independent delete pass once the
//! keep set is total. All remote mutations happen after the corresponding
//! plan is fully materialized, which is what makes dry-run reporting
//! exact.
//!
//! The reference behavior is strictly sequential; every upload is an
//! independent idempotent put, so interrupting a run mid-way leaves
//! already-uploaded objects valid.

pub mod exclude;
pub mod executor;
pub mod fingerprint;
pub mod headers;
pub mod keymap;
pub mod planner;
pub mod scan;
pub mod transform;

use sitesync_models::{LocalFileRecord, RunReport, SyncConfig};
use sitesync_notify::NotificationSink;
use sitesync_store::{ObjectStore, StoreError};

pub use crate::executor::{Confirmer, TerminalConfirmer};

/// Errors that abort a sync run.
///
/// Per-file upload/delete failures do not abort; they are logged and
/// counted in the [`RunReport`] instead.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// An exclusion pattern failed to compile.
    #[error("invalid exclude pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Local filesystem error during the scan or fingerprint pass.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote metadata lookup or listing failed while planning.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Runs one full synchronization of `config.local_path` against the store.
///
/// Uploads happen first; the delete pass only starts once the upload pass
/// is complete and the keep set reflects the entire local enumeration.
/// The summary is forwarded to `sink` with the environment label; the
/// removal summary is only emitted when the delete pass ran.
///
/// # Errors
///
/// Returns [`SyncError`] for fatal conditions: bad exclude patterns, scan
/// failures, and planning-time store errors.
pub async fn sync_environment(
    environment: &str,
    config: &SyncConfig,
    store: &dyn ObjectStore,
    confirmer: &dyn Confirmer,
    sink: &dyn NotificationSink,
) -> Result<RunReport, SyncError> {
    log::info!("Using settings for \"{environment}\" environment");

    let files = enumerate(config).await?;
    log::info!("{} files to consider", files.len());

    let plan = planner::plan_uploads(&files, store, config.force).await?;

    let mut report = RunReport::new(config.dry_run);
    executor::execute_uploads(&files, &plan, config, store, &mut report).await;

    if config.delete {
        // Hard barrier: the keep set is total here, so an orphan really is
        // an orphan.
        let keep = planner::keep_set(&files);
        let remote_keys = store.list(&keymap::listing_prefix(&config.bucket_path)).await?;
        let delete_plan = planner::plan_deletes(&remote_keys, &keep);
        executor::execute_deletes(&delete_plan, config, store, confirmer, &mut report).await;
    }

    sink.notify(environment, &report.updated_summary());
    if config.delete {
        sink.notify(environment, &report.removed_summary());
    }

    Ok(report)
}

/// Scan + exclude + fingerprint + key-map: produces the per-file records
/// the planner consumes.
async fn enumerate(config: &SyncConfig) -> Result<Vec<LocalFileRecord>, SyncError> {
    let filter = exclude::ExclusionFilter::new(&config.exclude)?;
    let paths = scan::scan(&config.local_path, config.symlinks)?;
    let paths = filter.filter(paths);

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let size = tokio::fs::metadata(&path).await?.len();
        // Fingerprint covers the original bytes; any gzip transform
        // happens strictly later.
        let digest = fingerprint::fingerprint(&path).await?;
        let key = keymap::remote_key(&path, &config.local_path, &config.bucket_path);
        files.push(LocalFileRecord {
            path,
            key,
            fingerprint: digest,
            size,
        });
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::{Path, PathBuf};

    use sitesync_models::{AclPolicy, SymlinkPolicy};
    use sitesync_notify::{NullSink, RecordingSink};
    use sitesync_store::MemoryStore;

    use crate::fingerprint::fingerprint_bytes;

    struct NeverAsked;
    impl Confirmer for NeverAsked {
        fn confirm(&self, _bucket: &str, _key: &str) -> bool {
            panic!("confirmation prompt should not be reached");
        }
    }

    fn fixture_tree(name: &str, files: &[(&str, &[u8])]) -> PathBuf {
        let root = std::env::temp_dir().join(format!("sitesync_run_{name}"));
        let _ = fs::remove_dir_all(&root);
        for (rel, contents) in files {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, contents).unwrap();
        }
        fs::create_dir_all(&root).unwrap();
        root
    }

    fn config(root: &Path) -> SyncConfig {
        SyncConfig {
            bucket: "mysite".to_string(),
            local_path: root.to_path_buf(),
            bucket_path: "/".to_string(),
            exclude: Vec::new(),
            cache: BTreeMap::new(),
            acl: AclPolicy::default(),
            charset: None,
            symlinks: SymlinkPolicy::default(),
            force: false,
            gzip: false,
            delete: false,
            confirm: false,
            dry_run: false,
        }
    }

    #[tokio::test]
    async fn mixed_skip_and_upload_scenario() {
        let root = fixture_tree(
            "mixed",
            &[("index.html", b"<html>" as &[u8]), ("app.js", b"js")],
        );
        let store = MemoryStore::new();
        // index.html already matches remote; app.js has no remote object.
        store.seed("index.html", b"<html>", &fingerprint_bytes(b"<html>"));

        let sink = RecordingSink::new();
        let report = sync_environment(
            "default",
            &config(&root),
            &store,
            &NeverAsked,
            &sink,
        )
        .await
        .unwrap();

        assert_eq!(report.updated, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(
            sink.messages(),
            vec![("default".to_string(), "1 files were updated".to_string())]
        );
        assert!(store.object("app.js").is_some());
    }

    #[tokio::test]
    async fn second_run_uploads_nothing() {
        let root = fixture_tree(
            "idempotent",
            &[("index.html", b"<html>" as &[u8]), ("css/app.css", b"body{}")],
        );
        let store = MemoryStore::new();
        let sink = RecordingSink::new();
        let cfg = config(&root);

        let first = sync_environment("default", &cfg, &store, &NeverAsked, &sink)
            .await
            .unwrap();
        assert_eq!(first.updated, 2);

        let second = sync_environment("default", &cfg, &store, &NeverAsked, &sink)
            .await
            .unwrap();
        assert_eq!(second.updated, 0);
    }

    #[tokio::test]
    async fn orphans_are_deleted_and_keep_set_is_untouched() {
        let root = fixture_tree("orphans", &[("a.png", b"png" as &[u8]), ("new.js", b"js")]);
        let store = MemoryStore::new();
        store.seed("a.png", b"png", &fingerprint_bytes(b"png"));
        store.seed("old.js", b"stale", "whatever");

        let mut cfg = config(&root);
        cfg.delete = true;

        let sink = RecordingSink::new();
        let report = sync_environment("default", &cfg, &store, &NeverAsked, &sink)
            .await
            .unwrap();

        assert_eq!(report.updated, 1); // new.js
        assert_eq!(report.deleted, 1); // old.js
        assert_eq!(store.keys(), vec!["a.png", "new.js"]);
        assert_eq!(
            sink.messages()[1].1,
            "1 files were removed".to_string()
        );
    }

    #[tokio::test]
    async fn dry_run_counts_match_a_real_run_with_zero_mutations() {
        let files: &[(&str, &[u8])] = &[("a.png", b"png"), ("new.js", b"js")];

        let seed = |store: &MemoryStore| {
            store.seed("a.png", b"png", &fingerprint_bytes(b"png"));
            store.seed("old.js", b"stale", "whatever");
        };

        let root = fixture_tree("dry_run", files);
        let mut cfg = config(&root);
        cfg.delete = true;

        let dry_store = MemoryStore::new();
        seed(&dry_store);
        let mut dry_cfg = cfg.clone();
        dry_cfg.dry_run = true;
        let dry = sync_environment("default", &dry_cfg, &dry_store, &NeverAsked, &RecordingSink::new())
            .await
            .unwrap();

        let real_store = MemoryStore::new();
        seed(&real_store);
        let real = sync_environment("default", &cfg, &real_store, &NeverAsked, &RecordingSink::new())
            .await
            .unwrap();

        assert_eq!(dry.updated, real.updated);
        assert_eq!(dry.deleted, real.deleted);
        assert_eq!(dry_store.mutation_count(), 0);
        assert!(real_store.mutation_count() > 0);
    }

    #[tokio::test]
    async fn dry_run_reports_in_hypothetical_tense() {
        let root = fixture_tree("tense", &[("page.html", b"<p>" as &[u8])]);
        let store = MemoryStore::new();
        let mut cfg = config(&root);
        cfg.dry_run = true;

        let sink = RecordingSink::new();
        sync_environment("default", &cfg, &store, &NeverAsked, &sink)
            .await
            .unwrap();

        assert_eq!(sink.messages()[0].1, "1 files would be updated");
    }

    #[tokio::test]
    async fn excluded_files_are_not_uploaded_and_not_kept() {
        let root = fixture_tree(
            "excluded",
            &[("notes.txt", b"keep" as &[u8]), ("notes.bak", b"drop")],
        );
        let store = MemoryStore::new();
        // A remote object matching an excluded local file is an orphan.
        store.seed("notes.bak", b"drop", &fingerprint_bytes(b"drop"));

        let mut cfg = config(&root);
        cfg.exclude = vec!["\\.bak$".to_string()];
        cfg.delete = true;

        let report = sync_environment("default", &cfg, &store, &NeverAsked, &RecordingSink::new())
            .await
            .unwrap();

        assert_eq!(report.updated, 1);
        assert_eq!(report.deleted, 1);
        assert_eq!(store.keys(), vec!["notes.txt"]);
    }

    #[tokio::test]
    async fn force_reuploads_matching_files() {
        let root = fixture_tree("force", &[("index.html", b"<html>" as &[u8])]);
        let store = MemoryStore::new();
        store.seed("index.html", b"<html>", &fingerprint_bytes(b"<html>"));

        let mut cfg = config(&root);
        cfg.force = true;

        let report = sync_environment("default", &cfg, &store, &NeverAsked, &NullSink)
            .await
            .unwrap();

        assert_eq!(report.updated, 1);
    }

    #[tokio::test]
    async fn gzip_transform_uploads_compressed_bytes_with_original_fingerprint() {
        let body = b"<html><body>some compressible content content content</body></html>";
        let root = fixture_tree("gzip", &[("index.html", body as &[u8])]);
        let store = MemoryStore::new();

        let mut cfg = config(&root);
        cfg.gzip = true;

        sync_environment("default", &cfg, &store, &NeverAsked, &NullSink)
            .await
            .unwrap();

        let object = store.object("index.html").unwrap();
        // Stored fingerprint is of the *original* bytes...
        assert_eq!(object.fingerprint, fingerprint_bytes(body));
        // ...while the stored body is gzip-encoded.
        assert_eq!(&object.body[..2], &[0x1f, 0x8b]);
        assert_eq!(object.headers.content_encoding.as_deref(), Some("gzip"));
        // No .gz artifact left behind.
        assert!(!root.join("index.html.gz").exists());
    }

    #[tokio::test]
    async fn bucket_path_prefix_scopes_keys_and_orphan_listing() {
        let root = fixture_tree("prefix", &[("img/a.png", b"png" as &[u8])]);
        let store = MemoryStore::new();
        store.seed("assets/img/old.png", b"stale", "x");
        // An object outside the prefix is never considered an orphan.
        store.seed("unrelated/file", b"keep", "y");

        let mut cfg = config(&root);
        cfg.bucket_path = "/assets/".to_string();
        cfg.delete = true;

        let report = sync_environment("default", &cfg, &store, &NeverAsked, &RecordingSink::new())
            .await
            .unwrap();

        assert_eq!(report.updated, 1);
        assert_eq!(report.deleted, 1);
        assert_eq!(store.keys(), vec!["assets/img/a.png", "unrelated/file"]);
    }
}
