//! trendwatch server
//!
//! Run with: cargo run --bin trendwatch -- --config trendwatch.toml
//!
//! Without `--config`, configuration is read from the default locations
//! (see [`Config::load_default`]) with `TRENDWATCH_*` environment overrides.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use trendwatch::api::{serve, AppState};
use trendwatch::config::Config;
use trendwatch::logging::init_logging;
use trendwatch::report::{report_once, spawn_reporter};
use trendwatch::tokenizer::{SimpleTokenizer, Tokenizer};
use trendwatch::window::build_aggregator;

#[derive(Parser)]
#[command(name = "trendwatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Sliding-window trending terms service")]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };

    init_logging(&config.logging)?;
    tracing::info!("Starting trendwatch v{}", env!("CARGO_PKG_VERSION"));

    let tokenizer: Arc<dyn Tokenizer> = match &config.tokenizer.dict_dir {
        Some(dir) => {
            tracing::info!("Loading tokenizer resources from {}", dir);
            Arc::new(SimpleTokenizer::from_dir(std::path::Path::new(dir))?)
        }
        None => Arc::new(SimpleTokenizer::new()),
    };

    let window_config = config.window.to_window_config();
    tracing::info!(
        window_secs = window_config.window_duration_secs,
        bucket_step_secs = window_config.bucket_step_secs,
        late_policy = %window_config.late_policy,
        vocabulary_limit = ?window_config.vocabulary_limit,
        shards = config.window.shards,
        "Initializing aggregator"
    );
    let aggregator = build_aggregator(tokenizer, window_config, config.window.shards)?;

    let reporter = if config.report.enabled {
        tracing::info!(
            "Reporting top {} every {}s",
            config.report.k,
            config.report.interval_secs
        );
        Some(spawn_reporter(Arc::clone(&aggregator), &config.report))
    } else {
        None
    };

    let api_config = config.api.to_api_config();
    let state = AppState::new(Arc::clone(&aggregator), api_config.clone());
    serve(state, &api_config).await?;

    if let Some(handle) = reporter {
        handle.abort();
    }
    report_once(aggregator.as_ref(), config.report.k);
    tracing::info!("Final stats: {}", aggregator.stats());
    tracing::info!("trendwatch stopped");

    Ok(())
}
