#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the sitesync deploy tool.
//!
//! Reads environments from a `deploy.json` file, resolves credentials
//! through the standard chain, and synchronizes each requested environment
//! against its bucket. Exit codes follow sysexits: configuration problems
//! (missing file, unknown environment, missing bucket or credentials,
//! unreachable bucket) exit with 66 before any remote mutation; a run that
//! completed with per-file failures exits with 1.

mod update;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use sitesync_config::{CliOverrides, ConfigFile, Credentials, resolve_credentials};
use sitesync_models::AclPolicy;
use sitesync_notify::{LogSink, NotificationSink};
use sitesync_store::{ObjectStore, S3Store};
use sitesync_sync::TerminalConfirmer;

/// `EX_NOINPUT`: required input (config, environment, bucket, credentials)
/// is missing or unusable.
const EXIT_NO_INPUT: u8 = 66;

#[derive(Parser)]
#[command(name = "sitesync", version, about = "Deploy a directory tree to an object-storage bucket")]
struct Cli {
    /// Which environment to deploy to
    #[arg(default_value = "default")]
    environment: String,

    /// Access key ID
    #[arg(short = 'a', long = "access-key")]
    access_key: Option<String>,

    /// Secret access key
    #[arg(short = 's', long = "access-secret")]
    access_secret: Option<String>,

    /// Upload all files whether they are currently up to date or not
    #[arg(short = 'f', long)]
    force: bool,

    /// Remove orphaned remote objects
    #[arg(long)]
    delete: bool,

    /// Deploy every configured environment
    #[arg(long)]
    all: bool,

    /// Show which files would be updated without uploading anything
    #[arg(short = 'n', long = "dry-run")]
    dry_run: bool,

    /// The ACL to apply to uploaded files [default: public-read]
    #[arg(long)]
    acl: Option<AclPolicy>,

    /// Gzip files before uploading
    #[arg(short = 'z', long)]
    gzip: bool,

    /// Confirm each file before deleting (only with --delete)
    #[arg(long)]
    confirm: bool,

    /// Charset header to add to text files
    #[arg(long)]
    charset: Option<String>,

    /// Path to the config file
    #[arg(short = 'c', long, default_value = "deploy.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    pretty_env_logger::init();

    let cli = Cli::parse();

    // Best-effort version check; failures are swallowed and never affect
    // the exit status.
    update::spawn_check();

    let config_file = match ConfigFile::load(&cli.config) {
        Ok(file) => file,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::from(EXIT_NO_INPUT);
        }
    };

    let environments: Vec<String> = if cli.all {
        config_file
            .environment_names()
            .iter()
            .map(ToString::to_string)
            .collect()
    } else {
        vec![cli.environment.clone()]
    };

    let overrides = CliOverrides {
        force: cli.force,
        gzip: cli.gzip,
        delete: cli.delete,
        confirm: cli.confirm,
        dry_run: cli.dry_run,
        acl: cli.acl,
        charset: cli.charset.clone(),
    };

    let sink = LogSink;
    let mut failures = 0u64;

    for (index, environment) in environments.iter().enumerate() {
        if cli.all {
            log::info!("Deploying environment {} of {}", index + 1, environments.len());
        }

        match deploy_environment(&cli, &config_file, environment, &overrides, &sink).await {
            Ok(failed) => failures += failed,
            Err(code) => return code,
        }
    }

    if failures > 0 {
        log::error!("{failures} files failed to sync");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Deploys one environment. Returns the per-file failure count, or the
/// fatal exit code for configuration/credential/bucket problems.
async fn deploy_environment(
    cli: &Cli,
    config_file: &ConfigFile,
    environment: &str,
    overrides: &CliOverrides,
    sink: &dyn NotificationSink,
) -> Result<u64, ExitCode> {
    let env_config = config_file.environment(environment).map_err(|e| {
        log::error!("{e}");
        ExitCode::from(EXIT_NO_INPUT)
    })?;

    let sync_config = config_file
        .sync_config(environment, overrides)
        .map_err(|e| {
            log::error!("{e}");
            ExitCode::from(EXIT_NO_INPUT)
        })?;

    let credentials = environment_credentials(cli, &env_config).ok_or_else(|| {
        log::error!("AWS credentials were not found in any configured source");
        ExitCode::from(EXIT_NO_INPUT)
    })?;

    let store = S3Store::connect(&sync_config.bucket, &credentials);

    // Preflight before scanning anything: access failures are fatal and
    // must abort before any remote mutation.
    if let Err(e) = store.verify_access().await {
        log::error!("{e}");
        return Err(ExitCode::from(EXIT_NO_INPUT));
    }

    let report = sitesync_sync::sync_environment(
        environment,
        &sync_config,
        &store,
        &TerminalConfirmer,
        sink,
    )
    .await
    .map_err(|e| {
        log::error!("{e}");
        ExitCode::FAILURE
    })?;

    Ok(report.failed)
}

/// Resolves credentials for one environment: per-environment values in
/// `deploy.json` win over the standard chain (CLI flags → local `.aws`
/// file → global `~/.aws` file → environment variables).
fn environment_credentials(
    cli: &Cli,
    env_config: &sitesync_config::EnvironmentConfig,
) -> Option<Credentials> {
    let chain = resolve_credentials(cli.access_key.clone(), cli.access_secret.clone());

    let key = env_config
        .aws_key
        .clone()
        .or_else(|| chain.as_ref().map(|c| c.key.clone()))?;
    let secret = env_config
        .aws_secret
        .clone()
        .or_else(|| chain.as_ref().map(|c| c.secret.clone()))?;

    Some(Credentials { key, secret })
}
