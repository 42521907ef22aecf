//! Analogue search CLI.
//!
//! Reads the run configuration and event catalogue, then searches one event
//! (`--event`) or every configured event (`--all`) against the preprocessed
//! anomaly archive of a dataset, writing CSV result tables per event.
//!
//! Exit codes: 0 when every event completed or was skipped, 1 when at least
//! one event failed, 2 on configuration errors, 3 when the anomaly archive is
//! missing.

mod config_loader;
mod paths;
mod runner;

use std::path::PathBuf;
use std::process::ExitCode;

use analogue_common::AnalogueError;
use analogue_engine::{PeriodFilter, SearchOptions};
use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, ValueEnum};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use config_loader::{analogue_error, default_config_dir, load_all_configs};
use paths::{validate_dataset, PipelinePaths};
use runner::{BatchRunner, BatchSummary};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

#[derive(Parser, Debug)]
#[command(name = "analogue-search")]
#[command(about = "Find historical circulation analogues of extreme events")]
#[command(group(ArgGroup::new("selection").required(true).args(["event", "all"])))]
struct Args {
    /// Dataset whose anomalies are searched (e.g. era5, mswx, jra3q)
    #[arg(short, long, env = "ANALOGUE_DATASET")]
    dataset: String,

    /// Event to process, as named in extreme_events.yaml
    #[arg(short, long)]
    event: Option<String>,

    /// Process every configured event
    #[arg(long)]
    all: bool,

    /// Restrict the search to one period: past, present or both
    #[arg(long, default_value = "both")]
    period: PeriodFilter,

    /// Recompute events whose results already exist
    #[arg(long)]
    force: bool,

    /// Pipeline root containing Data/
    #[arg(long, env = "ANALOGUE_ROOT", default_value = ".")]
    root: PathBuf,

    /// Directory holding analogue_config.yaml and extreme_events.yaml
    /// (default: <root>/config)
    #[arg(long, env = "ANALOGUE_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Worker threads for distance computation (default: all cores)
    #[arg(long, env = "ANALOGUE_THREADS")]
    threads: Option<usize>,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormat,
}

fn main() -> ExitCode {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args);

    let outcome = run(&args);
    match &outcome {
        Ok(summary) if summary.is_success() => {
            info!(dataset = %args.dataset, "Analogue search finished: {}", summary);
        }
        Ok(summary) => {
            warn!(dataset = %args.dataset, "Analogue search finished: {}", summary);
        }
        Err(e) => {
            error!(dataset = %args.dataset, "Analogue search aborted: {:#}", e);
        }
    }
    ExitCode::from(exit_code(&outcome))
}

/// Process exit status for the outcome of a run.
fn exit_code(outcome: &Result<BatchSummary>) -> u8 {
    match outcome {
        Ok(summary) if summary.is_success() => 0,
        Ok(_) => 1,
        Err(e) => match analogue_error(e) {
            Some(AnalogueError::PrerequisiteMissing { .. }) => 3,
            Some(inner) if inner.is_configuration() => 2,
            _ => 1,
        },
    }
}

fn init_tracing(args: &Args) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let builder = fmt().with_env_filter(filter).with_target(true).with_level(true);
    match args.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

fn run(args: &Args) -> Result<BatchSummary> {
    validate_dataset(&args.dataset)?;

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure worker threads")?;
    }

    let paths = PipelinePaths::new(&args.root);
    let config_dir = args
        .config_dir
        .clone()
        .unwrap_or_else(|| default_config_dir(paths.root()));
    let loaded = load_all_configs(&config_dir)?;
    let events = loaded.select_events(args.event.as_deref())?;

    info!(
        dataset = %args.dataset,
        root = %paths.root().display(),
        config_dir = %config_dir.display(),
        events = events.len(),
        n_analogues = loaded.config.n_analogues,
        periods = %args.period,
        force = args.force,
        "Starting analogue search"
    );

    let summary = BatchRunner::new(&paths, &args.dataset, &loaded.config)
        .with_options(SearchOptions {
            period_filter: args.period,
        })
        .with_force(args.force)
        .run(&events)?;

    Ok(summary)
}
