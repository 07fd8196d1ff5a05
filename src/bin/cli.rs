//! trendwatch CLI
//!
//! Command-line interface for trendwatch:
//! - Post messages to a running server
//! - Show the current ranking and stats
//! - Replay a message file through a local aggregator
//! - Generate a default config file

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use trendwatch::config::generate_default_config;
use trendwatch::report::format_ranking;
use trendwatch::tokenizer::{SimpleTokenizer, Tokenizer};
use trendwatch::window::{build_aggregator, IngestStatus, LatePolicy, TermCount, WindowConfig};

#[derive(Parser)]
#[command(name = "trendwatch-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Trending terms over a sliding time window")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API server URL
    #[arg(long, default_value = "http://localhost:8090", global = true)]
    pub api_url: String,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Post a message
    Post {
        /// Message text
        content: String,
        /// Timestamp (default: now). Supports: "now", ISO 8601, Unix milliseconds
        #[arg(short, long)]
        time: Option<String>,
    },

    /// Show the current top terms
    Top {
        /// Number of terms
        #[arg(short, default_value = "10")]
        k: i64,
    },

    /// Show aggregator statistics
    Stats,

    /// Replay a file of `timestamp_ms<TAB>text` lines through a local aggregator
    Replay {
        /// Path to the message file
        path: PathBuf,
        /// Window duration in seconds
        #[arg(long, default_value = "300")]
        window: i64,
        /// Bucket width in seconds
        #[arg(long, default_value = "1")]
        step: i64,
        /// Number of terms to print
        #[arg(short, default_value = "10")]
        k: i64,
        /// Late message handling (drop, clamp_to_latest, backfill)
        #[arg(long, default_value = "drop")]
        late_policy: String,
        /// Number of shards
        #[arg(long, default_value = "1")]
        shards: usize,
        /// Tokenizer dictionary directory
        #[arg(long)]
        dict_dir: Option<PathBuf>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Post { content, time } => {
            let timestamp = parse_timestamp(time.as_deref())?;
            let body = serde_json::json!({
                "content": content,
                "timestamp": timestamp,
            });

            let response = client
                .post(format!("{}/api/v1/messages", cli.api_url))
                .json(&body)
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                bail!("Failed ({}): {}", status, text);
            }

            let result: serde_json::Value = response.json().await?;
            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!(
                    "{}: {} terms counted in bucket {}",
                    result["status"].as_str().unwrap_or("unknown"),
                    result["counted"],
                    result["aligned_secs"]
                );
            }
        }

        Commands::Top { k } => {
            let response = client
                .get(format!("{}/api/v1/trending", cli.api_url))
                .query(&[("k", k)])
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                bail!("Failed ({}): {}", status, text);
            }

            let result: serde_json::Value = response.json().await?;
            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                let terms: Vec<TermCount> =
                    serde_json::from_value(result["terms"].clone()).unwrap_or_default();
                println!("Top {} over the last {}s:", k, result["window_secs"]);
                print_table(&terms);
            }
        }

        Commands::Stats => {
            let response = client
                .get(format!("{}/api/v1/stats", cli.api_url))
                .send()
                .await?;

            let result: serde_json::Value = response.json().await?;
            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("trendwatch Status");
                println!("─────────────────");
                for key in [
                    "window_secs",
                    "bucket_step_secs",
                    "late_policy",
                    "messages",
                    "terms_counted",
                    "late_dropped",
                    "buckets",
                    "active_terms",
                    "vocabulary",
                    "window_total",
                ] {
                    println!("{:<18} {}", key, result[key]);
                }
            }
        }

        Commands::Replay {
            path,
            window,
            step,
            k,
            late_policy,
            shards,
            dict_dir,
        } => {
            let policy: LatePolicy = late_policy.parse()?;
            let tokenizer: Arc<dyn Tokenizer> = match dict_dir {
                Some(dir) => Arc::new(SimpleTokenizer::from_dir(&dir)?),
                None => Arc::new(SimpleTokenizer::new()),
            };
            let config = WindowConfig::new(window, step).late_policy(policy);
            let aggregator = build_aggregator(tokenizer, config, shards)?;

            let messages = read_messages(&path)?;
            let mut dropped = 0;
            for (timestamp, text) in &messages {
                if aggregator.ingest(text, *timestamp).status == IngestStatus::DroppedLate {
                    dropped += 1;
                }
            }

            let top = aggregator.query_top_k(k);
            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&top)?);
            } else {
                println!(
                    "Replayed {} messages ({} dropped late): {}",
                    messages.len(),
                    dropped,
                    aggregator.stats()
                );
                print_table(&top);
            }
        }

        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Config written to {}", path.display());
                }
                None => print!("{}", content),
            }
        }
    }

    Ok(())
}

fn parse_timestamp(time: Option<&str>) -> anyhow::Result<i64> {
    match time {
        None | Some("now") => Ok(Utc::now().timestamp_millis()),
        Some(s) => {
            if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
                Ok(dt.timestamp_millis())
            } else if let Ok(ts) = s.parse::<i64>() {
                Ok(ts)
            } else {
                bail!("Invalid timestamp format: {}", s)
            }
        }
    }
}

/// Read `timestamp_ms<TAB>text` lines, skipping blanks and `#` comments
fn read_messages(path: &Path) -> anyhow::Result<Vec<(i64, String)>> {
    let file =
        std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut messages = Vec::new();

    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("reading {}", path.display()))?;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let (timestamp, text) = line
            .split_once('\t')
            .with_context(|| format!("line {}: expected timestamp_ms<TAB>text", number + 1))?;
        let timestamp: i64 = timestamp
            .trim()
            .parse()
            .with_context(|| format!("line {}: invalid timestamp '{}'", number + 1, timestamp))?;
        messages.push((timestamp, text.to_string()));
    }

    Ok(messages)
}

fn print_table(terms: &[TermCount]) {
    if terms.is_empty() {
        println!("  {}", format_ranking(terms));
        return;
    }
    println!("{:>4}  {:<30} {:>10}", "#", "TERM", "COUNT");
    for (rank, entry) in terms.iter().enumerate() {
        println!("{:>4}  {:<30} {:>10}", rank + 1, entry.term, entry.count);
    }
}
