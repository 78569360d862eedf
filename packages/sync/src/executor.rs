//! Plan execution against the remote store.
//!
//! Uploads and deletions run strictly sequentially, in plan order. Under
//! dry-run every step up to the mutating call still happens (including the
//! gzip transform and its cleanup), so reported counts are identical to a
//! real run. Per-file errors are recoverable: they are logged, counted,
//! and the run continues with the next entry.

use sitesync_models::{LocalFileRecord, RunReport, SyncAction, SyncConfig, SyncPlan};
use sitesync_store::ObjectStore;

use crate::headers::upload_headers;
use crate::transform;

/// Answers "remove this object?" for the delete pass.
///
/// Prompts must be answered one at a time, in plan order, so terminal
/// output never interleaves.
pub trait Confirmer {
    /// Whether the given key may be deleted. Anything but an explicit
    /// affirmative must return `false`.
    fn confirm(&self, bucket: &str, key: &str) -> bool;
}

/// Interactive confirmation via the terminal, default-deny.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConfirmer;

impl Confirmer for TerminalConfirmer {
    fn confirm(&self, bucket: &str, key: &str) -> bool {
        // Prompt failures (no tty, closed stdin) decline: fail-safe
        // toward not deleting.
        dialoguer::Confirm::new()
            .with_prompt(format!("Remove {bucket}/{key}?"))
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}

/// Executes the upload pass of a plan.
///
/// `files` and `plan` are parallel sequences produced by the planner from
/// the same enumeration. Idempotent at the key level: re-uploading a key
/// replaces content.
pub async fn execute_uploads(
    files: &[LocalFileRecord],
    plan: &SyncPlan,
    config: &SyncConfig,
    store: &dyn ObjectStore,
    report: &mut RunReport,
) {
    for (file, entry) in files.iter().zip(plan.entries()) {
        debug_assert_eq!(file.key, entry.key);

        match entry.action {
            SyncAction::Skip => {
                log::debug!("{}: up to date", entry.key);
            }
            SyncAction::Upload => {
                log::info!(
                    "Copying {} to {}/{} ({})",
                    file.path.display(),
                    config.bucket,
                    entry.key,
                    entry.reason
                );
                match upload_one(file, config, store).await {
                    Ok(()) => report.updated += 1,
                    Err(e) => {
                        log::error!("failed to upload {}: {e}", entry.key);
                        report.failed += 1;
                    }
                }
            }
            SyncAction::Delete => unreachable!("delete entries belong to the delete pass"),
        }
    }
}

/// Stages, transforms, and uploads one file.
async fn upload_one(
    file: &LocalFileRecord,
    config: &SyncConfig,
    store: &dyn ObjectStore,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let path = file.path.clone();
    let gzip = config.gzip;
    // The transform runs even under dry-run so that the run exercises the
    // same logic either way; the guard removes the artifact regardless.
    let prepared = tokio::task::spawn_blocking(move || transform::prepare(&path, gzip))
        .await
        .map_err(std::io::Error::other)??;

    // Headers are guessed from the original path, never the .gz artifact.
    let headers = upload_headers(&file.path, prepared.gzip_encoded(), config);

    if !config.dry_run {
        let body = tokio::fs::read(prepared.upload_path()).await?;
        store
            .put(&file.key, body, &headers, &file.fingerprint, config.acl)
            .await?;
    }

    drop(prepared);
    Ok(())
}

/// Executes the delete pass of a plan.
///
/// Candidates are confirmed one at a time when the confirm flag is set;
/// any non-affirmative answer skips the deletion.
pub async fn execute_deletes(
    plan: &SyncPlan,
    config: &SyncConfig,
    store: &dyn ObjectStore,
    confirmer: &dyn Confirmer,
    report: &mut RunReport,
) {
    for entry in plan.entries() {
        debug_assert_eq!(entry.action, SyncAction::Delete);

        if config.confirm && !confirmer.confirm(&config.bucket, &entry.key) {
            log::info!("Skipping removal of {}/{}", config.bucket, entry.key);
            continue;
        }

        log::info!("Deleting {}/{}", config.bucket, entry.key);

        if config.dry_run {
            report.deleted += 1;
            continue;
        }

        match store.delete(&entry.key).await {
            Ok(()) => report.deleted += 1,
            Err(e) => {
                log::error!("failed to delete {}: {e}", entry.key);
                report.failed += 1;
            }
        }
    }
}
