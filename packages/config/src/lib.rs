#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Configuration loading for sitesync.
//!
//! A `deploy.json` file maps environment names to settings:
//!
//! ```json
//! {
//!     "default": { "bucket": "mysite", "local_path": ".", "exclude": "\\.bak$" },
//!     "staging": { "bucket": "mysite-staging", "delete": true }
//! }
//! ```
//!
//! Every environment other than `"default"` inherits the `"default"`
//! entry's settings, overriding them field by field. All errors here are
//! fatal and surface before any remote call is made.

mod credentials;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use sitesync_models::{AclPolicy, SymlinkPolicy, SyncConfig};

pub use crate::credentials::{Credentials, CredentialSource, resolve_credentials, resolve_from};

/// Environment name used as the inheritance base for all others.
pub const DEFAULT_ENVIRONMENT: &str = "default";

/// Errors raised while loading or resolving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file does not exist or could not be read.
    #[error("config file {} is missing. Default is deploy.json in the current directory", path.display())]
    MissingFile {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// The config file is not valid JSON.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        /// Path of the unparseable file.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// The config file contains no environments at all.
    #[error("no environments found in config file")]
    NoEnvironments,

    /// The requested environment is not present in the config file.
    #[error("environment \"{name}\" not found in config. Choose from ({available})")]
    UnknownEnvironment {
        /// Requested environment name.
        name: String,
        /// Comma-separated list of configured environments.
        available: String,
    },

    /// The resolved environment has no bucket configured.
    #[error("a bucket to upload to was not specified for the \"{name}\" environment")]
    MissingBucket {
        /// Environment missing a bucket.
        name: String,
    },
}

/// `exclude` accepts either a single pattern string or a list of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    /// A single pattern.
    One(String),
    /// A list of patterns.
    Many(Vec<String>),
}

impl OneOrMany {
    /// Normalizes to a list.
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(s) => vec![s],
            Self::Many(v) => v,
        }
    }
}

/// One environment's raw settings as written in `deploy.json`.
///
/// Every field is optional so that a non-default environment only has to
/// state what differs from `"default"`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvironmentConfig {
    /// Target bucket name.
    pub bucket: Option<String>,
    /// Local directory to deploy. Defaults to `"."`.
    pub local_path: Option<String>,
    /// Remote key prefix. Defaults to `"/"`.
    pub bucket_path: Option<String>,
    /// Exclusion pattern(s), single string or list.
    pub exclude: Option<OneOrMany>,
    /// Cache-Control seconds keyed by full mimetype.
    pub cache: Option<BTreeMap<String, u64>>,
    /// ACL applied to uploads.
    pub acl: Option<AclPolicy>,
    /// Charset appended to text Content-Types.
    pub charset: Option<String>,
    /// Symlink handling during the scan.
    pub symlinks: Option<SymlinkPolicy>,
    /// Gzip uploads for this environment.
    pub gzip: Option<bool>,
    /// Remove orphaned remote objects.
    pub delete: Option<bool>,
    /// Prompt before each deletion.
    pub confirm: Option<bool>,
    /// Access key override for this environment.
    pub aws_key: Option<String>,
    /// Secret key override for this environment.
    pub aws_secret: Option<String>,
}

impl EnvironmentConfig {
    /// Overlays `self` on top of `base`: fields set here win, unset fields
    /// fall back to the base environment.
    #[must_use]
    pub fn merged_over(self, base: &Self) -> Self {
        Self {
            bucket: self.bucket.or_else(|| base.bucket.clone()),
            local_path: self.local_path.or_else(|| base.local_path.clone()),
            bucket_path: self.bucket_path.or_else(|| base.bucket_path.clone()),
            exclude: self.exclude.or_else(|| base.exclude.clone()),
            cache: self.cache.or_else(|| base.cache.clone()),
            acl: self.acl.or(base.acl),
            charset: self.charset.or_else(|| base.charset.clone()),
            symlinks: self.symlinks.or(base.symlinks),
            gzip: self.gzip.or(base.gzip),
            delete: self.delete.or(base.delete),
            confirm: self.confirm.or(base.confirm),
            aws_key: self.aws_key.or_else(|| base.aws_key.clone()),
            aws_secret: self.aws_secret.or_else(|| base.aws_secret.clone()),
        }
    }
}

/// CLI-level overrides folded into each environment's [`SyncConfig`].
///
/// Flags are additive: a flag set on the CLI or in the environment config
/// enables the behavior. The CLI charset and ACL take precedence over the
/// config file when both are present.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// `-f` / `--force`.
    pub force: bool,
    /// `-z` / `--gzip`.
    pub gzip: bool,
    /// `--delete`.
    pub delete: bool,
    /// `--confirm`.
    pub confirm: bool,
    /// `-n` / `--dry-run`.
    pub dry_run: bool,
    /// `--acl`.
    pub acl: Option<AclPolicy>,
    /// `--charset`.
    pub charset: Option<String>,
}

/// The parsed `deploy.json` file.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    environments: BTreeMap<String, EnvironmentConfig>,
}

impl ConfigFile {
    /// Loads and parses a `deploy.json` file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingFile`] if the file cannot be read,
    /// [`ConfigError::Parse`] if it is not valid JSON, and
    /// [`ConfigError::NoEnvironments`] if it parses to an empty object.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        Self::parse(&raw, path)
    }

    /// Parses config file contents.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] or [`ConfigError::NoEnvironments`].
    pub fn parse(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        let environments: BTreeMap<String, EnvironmentConfig> =
            serde_json::from_str(raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if environments.is_empty() {
            return Err(ConfigError::NoEnvironments);
        }

        Ok(Self { environments })
    }

    /// Names of all configured environments, in sorted order.
    #[must_use]
    pub fn environment_names(&self) -> Vec<&str> {
        self.environments.keys().map(String::as_str).collect()
    }

    /// Resolves one environment, merged over `"default"` when applicable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownEnvironment`] if `name` is not
    /// configured.
    pub fn environment(&self, name: &str) -> Result<EnvironmentConfig, ConfigError> {
        let env = self
            .environments
            .get(name)
            .ok_or_else(|| ConfigError::UnknownEnvironment {
                name: name.to_string(),
                available: self.environment_names().join(", "),
            })?
            .clone();

        if name == DEFAULT_ENVIRONMENT {
            return Ok(env);
        }

        Ok(match self.environments.get(DEFAULT_ENVIRONMENT) {
            Some(base) => env.merged_over(base),
            None => env,
        })
    }

    /// Builds the immutable per-run [`SyncConfig`] for one environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownEnvironment`] or
    /// [`ConfigError::MissingBucket`].
    pub fn sync_config(
        &self,
        name: &str,
        overrides: &CliOverrides,
    ) -> Result<SyncConfig, ConfigError> {
        let env = self.environment(name)?;

        let bucket = env.bucket.ok_or_else(|| ConfigError::MissingBucket {
            name: name.to_string(),
        })?;

        Ok(SyncConfig {
            bucket,
            local_path: PathBuf::from(env.local_path.unwrap_or_else(|| ".".to_string())),
            bucket_path: env.bucket_path.unwrap_or_else(|| "/".to_string()),
            exclude: env.exclude.map(OneOrMany::into_vec).unwrap_or_default(),
            cache: env.cache.unwrap_or_default(),
            acl: overrides.acl.or(env.acl).unwrap_or_default(),
            charset: overrides.charset.clone().or(env.charset),
            symlinks: env.symlinks.unwrap_or_default(),
            force: overrides.force,
            gzip: overrides.gzip || env.gzip.unwrap_or(false),
            delete: overrides.delete || env.delete.unwrap_or(false),
            confirm: overrides.confirm || env.confirm.unwrap_or(false),
            dry_run: overrides.dry_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "default": {
            "bucket": "mysite",
            "local_path": ".",
            "exclude": "\\.bak$",
            "cache": {"text/css": 86400}
        },
        "staging": {
            "bucket": "mysite-staging",
            "delete": true
        }
    }"#;

    fn sample() -> ConfigFile {
        ConfigFile::parse(SAMPLE, Path::new("deploy.json")).unwrap()
    }

    #[test]
    fn missing_file_error_names_the_path() {
        let err = ConfigFile::load(Path::new("/nonexistent/deploy.json")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "config file /nonexistent/deploy.json is missing. Default is deploy.json in the current directory"
        );
    }

    #[test]
    fn parse_error_names_the_path() {
        let err = ConfigFile::parse("not json", Path::new("deploy.json")).unwrap_err();
        assert!(err.to_string().starts_with("failed to parse deploy.json:"));
    }

    #[test]
    fn rejects_empty_config() {
        let err = ConfigFile::parse("{}", Path::new("deploy.json")).unwrap_err();
        assert!(matches!(err, ConfigError::NoEnvironments));
    }

    #[test]
    fn unknown_environment_lists_available() {
        let err = sample().environment("production").unwrap_err();
        match err {
            ConfigError::UnknownEnvironment { name, available } => {
                assert_eq!(name, "production");
                assert_eq!(available, "default, staging");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_default_environment_inherits_default() {
        let env = sample().environment("staging").unwrap();
        assert_eq!(env.bucket.as_deref(), Some("mysite-staging"));
        // Inherited from "default".
        assert_eq!(env.local_path.as_deref(), Some("."));
        assert_eq!(env.cache.unwrap().get("text/css"), Some(&86400));
        assert_eq!(env.delete, Some(true));
    }

    #[test]
    fn exclude_accepts_string_or_list() {
        let cfg = ConfigFile::parse(
            r#"{"default": {"bucket": "b", "exclude": ["\\.bak$", "^tmp/"]}}"#,
            Path::new("deploy.json"),
        )
        .unwrap();
        let sync = cfg
            .sync_config("default", &CliOverrides::default())
            .unwrap();
        assert_eq!(sync.exclude, vec!["\\.bak$".to_string(), "^tmp/".to_string()]);

        let single = sample()
            .sync_config("default", &CliOverrides::default())
            .unwrap();
        assert_eq!(single.exclude, vec!["\\.bak$".to_string()]);
    }

    #[test]
    fn missing_bucket_is_fatal() {
        let cfg =
            ConfigFile::parse(r#"{"default": {"local_path": "."}}"#, Path::new("deploy.json"))
                .unwrap();
        let err = cfg
            .sync_config("default", &CliOverrides::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingBucket { .. }));
    }

    #[test]
    fn cli_flags_or_config_flags_enable_behavior() {
        let cfg = sample();

        // delete comes from the config for staging...
        let sync = cfg
            .sync_config("staging", &CliOverrides::default())
            .unwrap();
        assert!(sync.delete);
        assert!(!sync.gzip);

        // ...and from the CLI for default.
        let overrides = CliOverrides {
            gzip: true,
            ..CliOverrides::default()
        };
        let sync = cfg.sync_config("default", &overrides).unwrap();
        assert!(sync.gzip);
        assert!(!sync.delete);
    }

    #[test]
    fn cli_charset_beats_config_charset() {
        let cfg = ConfigFile::parse(
            r#"{"default": {"bucket": "b", "charset": "latin-1"}}"#,
            Path::new("deploy.json"),
        )
        .unwrap();

        let sync = cfg
            .sync_config("default", &CliOverrides::default())
            .unwrap();
        assert_eq!(sync.charset.as_deref(), Some("latin-1"));

        let overrides = CliOverrides {
            charset: Some("utf-8".to_string()),
            ..CliOverrides::default()
        };
        let sync = cfg.sync_config("default", &overrides).unwrap();
        assert_eq!(sync.charset.as_deref(), Some("utf-8"));
    }
}
