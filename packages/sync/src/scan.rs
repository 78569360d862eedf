//! Local file tree enumeration.
//!
//! Version-control directories are pruned at every nesting level, not just
//! the root. Output order is walkdir's name-sorted order, which is stable
//! within a run so that confirmation prompts always refer to a consistent
//! set.

use std::path::{Path, PathBuf};

use sitesync_models::SymlinkPolicy;
use walkdir::WalkDir;

/// Directory names that are never uploaded.
const VCS_DIRECTORIES: &[&str] = &[".git", ".svn", ".hg"];

/// Recursively enumerates files under `root`.
///
/// Scan errors are fatal: a partial enumeration would make the keep set
/// incomplete and could trigger spurious deletions downstream. Dangling
/// symlinks are the one exception — they have no content to upload and
/// are skipped with a warning under either policy.
///
/// # Errors
///
/// Returns the underlying I/O error if any directory entry cannot be read.
pub fn scan(root: &Path, symlinks: SymlinkPolicy) -> Result<Vec<PathBuf>, std::io::Error> {
    let follow = matches!(symlinks, SymlinkPolicy::Follow);

    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(follow)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_vcs_directory(entry.file_name(), entry.file_type().is_dir()));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            // A dangling symlink surfaces mid-walk as a NotFound error
            // when links are followed; it has no content to upload, so
            // skip it. Anything else leaves the enumeration incomplete
            // and stays fatal.
            Err(e)
                if e.io_error()
                    .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound) =>
            {
                log::warn!("skipping dangling symlink: {e}");
                continue;
            }
            Err(e) => return Err(std::io::Error::other(e)),
        };
        let file_type = entry.file_type();

        if file_type.is_file() {
            files.push(entry.path().to_path_buf());
        } else if file_type.is_symlink() && matches!(symlinks, SymlinkPolicy::AsFile) {
            // Unfollowed symlink: upload it as a plain file if it resolves
            // to one; dangling links are skipped with a warning.
            match std::fs::metadata(entry.path()) {
                Ok(meta) if meta.is_file() => files.push(entry.path().to_path_buf()),
                Ok(_) => {}
                Err(e) => {
                    log::warn!("skipping dangling symlink {}: {e}", entry.path().display());
                }
            }
        }
    }

    Ok(files)
}

fn is_vcs_directory(name: &std::ffi::OsStr, is_dir: bool) -> bool {
    is_dir && VCS_DIRECTORIES.iter().any(|vcs| name == *vcs)
}
