//! Img-Miner main entry point
//!
//! This is the command-line interface for the Img-Miner identifier miner.

use anyhow::Context;
use clap::Parser;
use img_miner::config::{load_config_with_hash, Config};
use img_miner::generator::{build_generator, IdSpace};
use img_miner::miner::{listen_for_shutdown, resume_progress, Miner};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Img-Miner: a resumable screenshot identifier miner
///
/// Img-Miner guesses short identifiers on a screenshot hosting service,
/// downloads whatever each page embeds, and checkpoints its progress so that
/// it can be stopped and resumed at any time.
#[derive(Parser, Debug)]
#[command(name = "img-miner")]
#[command(version = "1.0.0")]
#[command(about = "A resumable screenshot identifier miner", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Start from zero, ignoring any existing checkpoint
    #[arg(long)]
    fresh: bool,

    /// Validate config and show the next identifiers without fetching anything
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics for the save directory and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config, cli.fresh)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_mine(&config, cli.fresh).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("img_miner=info,warn"),
            1 => EnvFilter::new("img_miner=debug,info"),
            2 => EnvFilter::new("img_miner=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles --dry-run: shows the effective configuration and next identifiers
fn handle_dry_run(config: &Config, fresh: bool) -> anyhow::Result<()> {
    println!("=== Img-Miner Dry Run ===\n");

    println!("Miner:");
    println!("  Base address: {}", config.miner.base_address);
    println!("  Threads: {}", config.miner.threads);
    println!("  Batch size: {}", config.miner.batch_size);
    println!("  Checkpoint every: {}", config.miner.checkpoint_every);
    println!("  Images limit: {}", config.miner.images_limit);

    println!("\nHTTP:");
    println!("  User agent: {}", config.http.user_agent);
    println!("  Retries: {}", config.http.retries_total);
    println!("  Backoff factor: {}ms", config.http.backoff_factor_ms);
    println!("  Timeout: {}s", config.http.timeout_secs);

    println!("\nOutput:");
    println!("  Save dir: {}", config.output.save_dir);

    let (progress, offset) = resume_progress(config, fresh)?;
    let space = IdSpace::new(&config.generator.first_char, config.generator.id_length)?;
    let mut generator = build_generator(
        progress.generator_type,
        space,
        progress.random_seed.unwrap_or(config.generator.seed),
        offset,
    );

    println!("\nGenerator:");
    println!("  Strategy: {}", progress.generator_type);
    if let Some(seed) = progress.random_seed {
        println!("  Seed: {}", seed);
    }
    println!("  Resume offset: {}", offset);
    println!("  Next batch: {}", progress.batch_id);
    if let Some(remaining) = generator.remaining() {
        println!("  Remaining identifiers: {}", remaining);
    }

    let preview = generator.remaining().map_or(5, |r| r.min(5) as usize);
    println!("\nNext identifiers:");
    for id in generator.next_n(preview)? {
        println!("  - {}{}", base_with_slash(&config.miner.base_address), id);
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles --stats: summarizes the save directory
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use img_miner::output::{load_statistics, print_statistics};

    println!("Save dir: {}\n", config.output.save_dir);
    let stats = load_statistics(Path::new(&config.output.save_dir))?;
    print_statistics(&stats);
    Ok(())
}

/// Handles the main mining operation
async fn handle_mine(config: &Config, fresh: bool) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    let listener = listen_for_shutdown(shutdown.clone());

    let mut miner = Miner::open(config.clone(), fresh)
        .await
        .context("Failed to initialize miner")?;
    let result = miner.run(shutdown.clone()).await;

    // Stop the signal listener if the run ended on its own
    shutdown.cancel();
    let _ = listener.await;

    match result {
        Ok(outcome) => {
            tracing::info!(
                "Mining stopped ({}): {} processed, {} successful",
                outcome.reason,
                outcome.progress.n_processed,
                outcome.progress.n_successful
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Mining failed: {}", e);
            Err(e.into())
        }
    }
}

fn base_with_slash(base: &str) -> String {
    if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    }
}
