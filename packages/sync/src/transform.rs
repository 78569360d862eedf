//! Optional gzip transform, applied strictly after fingerprinting.
//!
//! Files that are already gzip-encoded (by extension or magic bytes) are
//! uploaded as-is but still get `Content-Encoding: gzip`. The compressed
//! artifact is transient: it lives in the system temp directory under a
//! run-unique name and is removed when the [`PreparedContent`] guard
//! drops, whether the upload succeeded, failed, or was a dry-run.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use flate2::Compression;
use flate2::write::GzEncoder;

/// Leading bytes of a gzip stream.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// File extensions that already indicate gzip encoding.
const GZIP_EXTENSIONS: &[&str] = &["gz", "tgz", "svgz"];

/// The content staged for one upload attempt.
///
/// Owns the transient `.gz` artifact, if one was produced, and removes it
/// on drop.
#[derive(Debug)]
pub struct PreparedContent {
    source: PathBuf,
    artifact: Option<PathBuf>,
    gzip_encoded: bool,
}

impl PreparedContent {
    /// The path whose bytes should be uploaded.
    #[must_use]
    pub fn upload_path(&self) -> &Path {
        self.artifact.as_deref().unwrap_or(&self.source)
    }

    /// Whether the uploaded bytes are gzip-encoded (originally or via the
    /// transform), which drives the Content-Encoding header.
    #[must_use]
    pub const fn gzip_encoded(&self) -> bool {
        self.gzip_encoded
    }
}

impl Drop for PreparedContent {
    fn drop(&mut self) {
        if let Some(artifact) = &self.artifact
            && let Err(e) = std::fs::remove_file(artifact)
        {
            log::warn!("failed to remove {}: {e}", artifact.display());
        }
    }
}

/// Stages a file for upload, compressing it when the gzip transform is
/// enabled and the content is not already gzip.
///
/// The fingerprint computed earlier over the original bytes is reused
/// unchanged; nothing here feeds back into change detection.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the artifact cannot be
/// written.
pub fn prepare(path: &Path, gzip_enabled: bool) -> Result<PreparedContent, std::io::Error> {
    let already_gzipped = has_gzip_extension(path) || has_gzip_magic(path)?;

    if !gzip_enabled || already_gzipped {
        return Ok(PreparedContent {
            source: path.to_path_buf(),
            artifact: None,
            gzip_encoded: already_gzipped,
        });
    }

    let artifact = artifact_path(path);
    compress_to(path, &artifact)?;

    Ok(PreparedContent {
        source: path.to_path_buf(),
        artifact: Some(artifact),
        gzip_encoded: true,
    })
}

/// Monotonic suffix so concurrent runs never share an artifact path.
static ARTIFACT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Picks a unique artifact path in the system temp directory.
///
/// Never a sibling of the source: a `<name>.gz` next to the original
/// would collide with a real precompressed companion file, and the drop
/// guard would then delete the user's file.
fn artifact_path(path: &Path) -> PathBuf {
    let seq = ARTIFACT_SEQ.fetch_add(1, Ordering::Relaxed);
    let mut name = std::ffi::OsString::from(format!("sitesync-{}-{seq}-", std::process::id()));
    name.push(path.file_name().unwrap_or_else(|| "content".as_ref()));
    name.push(".gz");
    std::env::temp_dir().join(name)
}

fn has_gzip_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| GZIP_EXTENSIONS.iter().any(|g| ext.eq_ignore_ascii_case(g)))
}

fn has_gzip_magic(path: &Path) -> Result<bool, std::io::Error> {
    let mut file = std::fs::File::open(path)?;
    let mut leading = [0u8; 2];
    match file.read_exact(&mut leading) {
        Ok(()) => Ok(leading == GZIP_MAGIC),
        // Shorter than two bytes: cannot be gzip.
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

fn compress_to(source: &Path, artifact: &Path) -> Result<(), std::io::Error> {
    let mut input = std::fs::File::open(source)?;
    let output = std::fs::File::create(artifact)?;
    let mut encoder = GzEncoder::new(output, Compression::default());
    std::io::copy(&mut input, &mut encoder)?;
    encoder.finish()?;
    Ok(())
}
