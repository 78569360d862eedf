#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared data types for the sitesync deploy engine.
//!
//! Everything here is plain data: the resolved per-environment
//! [`SyncConfig`], the per-file and per-object records produced during a
//! run, the fully materialized [`SyncPlan`], and the [`RunReport`] that
//! summarizes what happened (or, under dry-run, what would have happened).

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use strum_macros::{AsRefStr, Display, EnumString};

/// Canned access-control policy applied to every uploaded object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AclPolicy {
    /// Owner-only access.
    Private,
    /// World-readable, owner-writable.
    #[default]
    PublicRead,
    /// World-readable and world-writable.
    PublicReadWrite,
    /// Readable by any authenticated user.
    AuthenticatedRead,
}

/// How the scanner treats symbolic links.
///
/// The original tool inherited whatever the OS walk did with symlinks;
/// here it is an explicit, documented config choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymlinkPolicy {
    /// Follow symlinks: linked directories are descended into and linked
    /// files are uploaded under the link's own path.
    #[default]
    Follow,
    /// Treat symlinks as plain files: linked directories are not descended
    /// into; a symlink to a file is uploaded with the link target's bytes.
    AsFile,
}

/// Fully resolved configuration for one sync run against one environment.
///
/// Built by merging the environment's `deploy.json` entry with CLI flags.
/// Immutable for the duration of the run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Target bucket name.
    pub bucket: String,
    /// Local directory tree to deploy.
    pub local_path: PathBuf,
    /// Remote key prefix objects are uploaded under.
    pub bucket_path: String,
    /// Unanchored regex patterns; a path matching any of them is excluded.
    pub exclude: Vec<String>,
    /// Cache-Control durations in seconds, keyed by full mimetype
    /// (e.g. `"text/css"` → `86400`).
    pub cache: BTreeMap<String, u64>,
    /// ACL applied to every uploaded object.
    pub acl: AclPolicy,
    /// Charset appended to the Content-Type of `text/*` uploads.
    pub charset: Option<String>,
    /// Symlink handling during the local scan.
    pub symlinks: SymlinkPolicy,
    /// Upload every file regardless of fingerprint equality.
    pub force: bool,
    /// Gzip file contents before uploading.
    pub gzip: bool,
    /// Remove orphaned remote objects after the upload pass.
    pub delete: bool,
    /// Prompt before each orphan deletion (default-deny).
    pub confirm: bool,
    /// Compute and report all actions without performing any remote mutation.
    pub dry_run: bool,
}

/// A local file selected for synchronization.
///
/// Created during the scan pass and discarded at run end.
#[derive(Debug, Clone)]
pub struct LocalFileRecord {
    /// Path on disk as produced by the scanner.
    pub path: PathBuf,
    /// Remote key derived from the path (pure function of path + config).
    pub key: String,
    /// MD5 hex digest of the file's original, untransformed bytes.
    pub fingerprint: String,
    /// File size in bytes.
    pub size: u64,
}

/// Metadata for an existing remote object, as returned by a point lookup.
#[derive(Debug, Clone)]
pub struct RemoteMetadata {
    /// Fingerprint stored as custom metadata by a previous run, if any.
    /// Objects uploaded out-of-band have none and always compare stale.
    pub fingerprint: Option<String>,
    /// Remote content length, if the store reports one.
    pub size: Option<u64>,
}

/// Headers attached to an uploaded object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectHeaders {
    /// Content-Type, including any `;charset=` suffix for text types.
    pub content_type: Option<String>,
    /// `gzip` when the uploaded bytes are gzip-encoded.
    pub content_encoding: Option<String>,
    /// `max-age=<secs>, public` for mimetypes in the cache map.
    pub cache_control: Option<String>,
}

/// The action planned for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SyncAction {
    /// Write the local content to the remote key.
    Upload,
    /// Leave the remote object untouched.
    Skip,
    /// Remove the orphaned remote object.
    Delete,
}

/// Why an action was planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum PlanReason {
    /// No remote object exists for the key.
    New,
    /// Remote fingerprint differs from the local one.
    Changed,
    /// Fingerprints match but the force flag is set.
    Forced,
    /// Remote fingerprint matches the local one.
    Unchanged,
    /// Remote key has no corresponding local file.
    Orphaned,
}

/// One planned action for one remote key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    /// Remote key the action applies to.
    pub key: String,
    /// What to do.
    pub action: SyncAction,
    /// Why.
    pub reason: PlanReason,
}

/// The complete set of planned actions for one run.
///
/// Materialized in full before any mutating remote call, which is what
/// makes dry-run byte-identical in logic to a real run.
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    entries: Vec<PlanEntry>,
}

impl SyncPlan {
    /// Creates an empty plan.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends an entry to the plan.
    pub fn push(&mut self, entry: PlanEntry) {
        self.entries.push(entry);
    }

    /// All planned entries, in planning order.
    #[must_use]
    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    /// Number of entries with the given action.
    #[must_use]
    pub fn count(&self, action: SyncAction) -> usize {
        self.entries.iter().filter(|e| e.action == action).count()
    }
}

/// Outcome counts for one sync run.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunReport {
    /// Files uploaded (or that would be, under dry-run).
    pub updated: u64,
    /// Remote objects deleted (or that would be, under dry-run).
    pub deleted: u64,
    /// Per-file upload/delete failures. Never incremented under dry-run.
    pub failed: u64,
    /// Whether this run was hypothetical.
    pub dry_run: bool,
}

impl RunReport {
    /// Creates an empty report with the given tense.
    #[must_use]
    pub const fn new(dry_run: bool) -> Self {
        Self {
            updated: 0,
            deleted: 0,
            failed: 0,
            dry_run,
        }
    }

    /// `"were"` for a real run, `"would be"` under dry-run.
    #[must_use]
    pub const fn tense(&self) -> &'static str {
        if self.dry_run { "would be" } else { "were" }
    }

    /// Summary sentence for the upload pass.
    #[must_use]
    pub fn updated_summary(&self) -> String {
        format!("{} files {} updated", self.updated, self.tense())
    }

    /// Summary sentence for the delete pass.
    #[must_use]
    pub fn removed_summary(&self) -> String {
        format!("{} files {} removed", self.deleted, self.tense())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acl_round_trips_kebab_case() {
        assert_eq!(AclPolicy::PublicRead.to_string(), "public-read");
        assert_eq!(
            "authenticated-read".parse::<AclPolicy>().unwrap(),
            AclPolicy::AuthenticatedRead
        );
        assert!("public_read".parse::<AclPolicy>().is_err());
    }

    #[test]
    fn acl_parse_error_is_a_std_error() {
        // clap's FromStr-based value parser requires the Err type to
        // implement std::error::Error.
        let err = "bogus".parse::<AclPolicy>().unwrap_err();
        let _: &dyn std::error::Error = &err;
    }

    #[test]
    fn report_tense_follows_dry_run_flag() {
        let mut report = RunReport::new(false);
        report.updated = 1;
        assert_eq!(report.updated_summary(), "1 files were updated");

        let mut report = RunReport::new(true);
        report.deleted = 2;
        assert_eq!(report.removed_summary(), "2 files would be removed");
    }

    #[test]
    fn plan_counts_by_action() {
        let mut plan = SyncPlan::new();
        plan.push(PlanEntry {
            key: "a".into(),
            action: SyncAction::Upload,
            reason: PlanReason::New,
        });
        plan.push(PlanEntry {
            key: "b".into(),
            action: SyncAction::Skip,
            reason: PlanReason::Unchanged,
        });
        assert_eq!(plan.count(SyncAction::Upload), 1);
        assert_eq!(plan.count(SyncAction::Skip), 1);
        assert_eq!(plan.count(SyncAction::Delete), 0);
    }
}
