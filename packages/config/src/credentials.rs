//! Ordered credential resolution.
//!
//! Access key and secret are resolved independently through a fixed chain
//! of sources; for each, the first source that yields a value wins:
//!
//! 1. Explicit CLI flags (`-a` / `-s`).
//! 2. A `.aws` file in the current directory (`[Credentials]` section).
//! 3. The global `~/.aws` file.
//! 4. The `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` environment
//!    variables.
//!
//! A per-environment `aws_key` / `aws_secret` in `deploy.json` overrides
//! the chain entirely and is applied by the caller, not here.

use std::path::{Path, PathBuf};

/// A resolved access key / secret pair.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Access key ID.
    pub key: String,
    /// Secret access key.
    pub secret: String,
}

/// One source of credentials in the resolution chain.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Values passed explicitly (CLI flags).
    Explicit {
        /// Access key, if given.
        key: Option<String>,
        /// Secret, if given.
        secret: Option<String>,
    },
    /// An INI-style credentials file with a `[Credentials]` section.
    File(PathBuf),
    /// `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`.
    Environment,
}

impl CredentialSource {
    fn lookup_key(&self) -> Option<String> {
        match self {
            Self::Explicit { key, .. } => key.clone(),
            Self::File(path) => read_credentials_field(path, "aws_access_key_id"),
            Self::Environment => std::env::var("AWS_ACCESS_KEY_ID").ok(),
        }
    }

    fn lookup_secret(&self) -> Option<String> {
        match self {
            Self::Explicit { secret, .. } => secret.clone(),
            Self::File(path) => read_credentials_field(path, "aws_secret_access_key"),
            Self::Environment => std::env::var("AWS_SECRET_ACCESS_KEY").ok(),
        }
    }
}

/// Resolves credentials through the given chain of sources.
///
/// Key and secret are resolved independently, so the key may come from an
/// earlier source than the secret. Returns `None` unless both resolve to a
/// non-empty value.
#[must_use]
pub fn resolve_from(sources: &[CredentialSource]) -> Option<Credentials> {
    let key = sources.iter().find_map(CredentialSource::lookup_key)?;
    let secret = sources.iter().find_map(CredentialSource::lookup_secret)?;

    if key.is_empty() || secret.is_empty() {
        return None;
    }

    Some(Credentials { key, secret })
}

/// Resolves credentials through the standard chain, starting from optional
/// explicit CLI values.
#[must_use]
pub fn resolve_credentials(
    cli_key: Option<String>,
    cli_secret: Option<String>,
) -> Option<Credentials> {
    let mut sources = vec![
        CredentialSource::Explicit {
            key: cli_key,
            secret: cli_secret,
        },
        CredentialSource::File(PathBuf::from(".aws")),
    ];

    if let Some(home) = std::env::var_os("HOME") {
        sources.push(CredentialSource::File(PathBuf::from(home).join(".aws")));
    }

    sources.push(CredentialSource::Environment);

    resolve_from(&sources)
}

/// Reads one field from the `[Credentials]` section of an INI-style file.
///
/// Returns `None` if the file is missing, has no such section, or has no
/// such field. The format is only what the original tooling wrote: section
/// headers in brackets, `name = value` pairs, `#`/`;` comments.
fn read_credentials_field(path: &Path, field: &str) -> Option<String> {
    let raw = std::fs::read_to_string(path).ok()?;

    let mut in_credentials = false;
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_credentials = section.eq_ignore_ascii_case("credentials");
            continue;
        }
        if !in_credentials {
            continue;
        }
        if let Some((name, value)) = line.split_once('=')
            && name.trim() == field
        {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    None
}
