//! verify-metadata - VoisLab track metadata verifier
//!
//! Checks every record in the metadata table against the stored media
//! file: title derived from the filename, duration, content hash and
//! genre. With `--auto-correct` it writes fixes back after backing up
//! each record.
//!
//! Exit codes: 0 on a clean run, a cancelled correction, or an
//! auto-correct run; 1 when findings remain in report-only mode or setup
//! fails.

use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use voislab_common::config::{CliOverrides, TomlConfig, VerifyConfig};
use voislab_verify::report::{render_summary, TerminalPrompt};
use voislab_verify::services::{DurationProbe, LoftyDurationProbe};
use voislab_verify::store::{DynamoMetadataStore, S3MediaStore};
use voislab_verify::{Pipeline, RunOptions};

/// Command-line arguments for verify-metadata
#[derive(Parser, Debug)]
#[command(name = "verify-metadata")]
#[command(about = "Verify VoisLab track metadata against stored media files")]
#[command(version)]
struct Args {
    /// Target environment
    #[arg(value_parser = ["dev", "prod"])]
    environment: Option<String>,

    /// Write corrected values back to the metadata table
    #[arg(long)]
    auto_correct: bool,

    /// Apply corrections without asking for confirmation
    #[arg(short = 'y', long)]
    yes: bool,

    /// Skip duration and hash checks (no file downloads)
    #[arg(long)]
    fast: bool,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,

    /// Also report track directories that have no metadata record
    #[arg(long)]
    orphans: bool,

    /// AWS region (defaults to the SDK configuration chain)
    #[arg(long)]
    region: Option<String>,

    /// Directory for the error log and backup file
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Config file (default: <config dir>/voislab/verify.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    info!(
        "Starting verify-metadata v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let file_config = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    let cli = CliOverrides {
        environment: args.environment.clone(),
        region: args.region.clone(),
        output_dir: args.output_dir.clone(),
    };
    let config = VerifyConfig::resolve(&cli, &file_config).context("Invalid configuration")?;

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!("Failed to create output directory {}", config.output_dir.display())
    })?;

    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &config.region {
        loader = loader.region(aws_sdk_dynamodb::config::Region::new(region.clone()));
    }
    let aws = loader.load().await;

    let bucket = match &config.media_bucket {
        Some(bucket) => bucket.clone(),
        None => {
            let identity = aws_sdk_sts::Client::new(&aws)
                .get_caller_identity()
                .send()
                .await
                .context("Failed to resolve AWS account (are credentials configured?)")?;
            let account = identity
                .account()
                .context("AWS caller identity has no account id")?;
            config.media_bucket_for_account(account)
        }
    };

    info!(environment = %config.environment, table = %config.metadata_table, bucket = %bucket, "Verifying metadata");

    let metadata = DynamoMetadataStore::new(
        aws_sdk_dynamodb::Client::new(&aws),
        config.metadata_table.clone(),
    );
    let media = S3MediaStore::new(aws_sdk_s3::Client::new(&aws), bucket);
    let probe = LoftyDurationProbe::new();

    let options = RunOptions {
        auto_correct: args.auto_correct,
        assume_yes: args.yes,
        fast: args.fast,
        orphans: args.orphans,
    };
    if options.fast {
        info!("Fast mode: skipping duration and hash checks");
    }

    let pipeline = Pipeline::new(
        &metadata,
        &media,
        Some(&probe as &dyn DurationProbe),
        &config,
        options,
    );
    let mut prompt = TerminalPrompt::new(std::io::stdin().lock(), std::io::stdout());
    let stamp = voislab_common::time::file_stamp(voislab_common::time::now());

    let outcome = pipeline
        .run(&mut prompt, &stamp)
        .await
        .context("Verification failed")?;

    println!();
    print!("{}", render_summary(config.environment, &outcome.stats, &outcome.artifacts));
    if outcome.aborted {
        println!("Corrections cancelled; no changes were made.");
    }

    let code = outcome.exit_code(&options);
    if code != 0 {
        println!("Unresolved metadata errors remain (run with --auto-correct to fix).");
    }
    std::process::exit(code);
}
