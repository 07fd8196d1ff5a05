//! # trendwatch
//!
//! Live ranking of the most frequent terms in a stream of text messages,
//! restricted to a trailing time window.
//!
//! ## Features
//!
//! - **Exact sliding counts**: fixed-width time buckets expire incrementally,
//!   no rescans of history
//! - **Compact ids**: terms are interned once and counted by identifier
//! - **Concurrent access**: one reader-writer lock, or hash-partitioned shards
//! - **Late data policy**: drop, clamp to the newest bucket, or backfill
//! - **HTTP service**: ingest and query over a small REST API
//!
//! ## Modules
//!
//! - [`window`]: Interner, buckets, slider, top-K and aggregator facades
//! - [`tokenizer`]: Text segmentation boundary
//! - [`api`]: REST API server with Axum
//! - [`config`]: TOML + environment configuration
//! - [`report`]: Periodic ranking reports
//!
//! ## Quick Start
//!
//! ```rust
//! use trendwatch::window::{TermAggregator, TrendAggregator, WindowConfig};
//!
//! let agg = TermAggregator::with_default_tokenizer(WindowConfig::new(60, 1)).unwrap();
//! agg.ingest("rust 1.80 released", 1_700_000_000_000);
//! agg.ingest("rust survey results", 1_700_000_001_000);
//!
//! for entry in agg.query_top_k(3) {
//!     println!("{}: {}", entry.term, entry.count);
//! }
//! ```

pub mod api;
pub mod config;
pub mod logging;
pub mod report;
pub mod tokenizer;
pub mod window;

// Re-export top-level types for convenience
pub use window::{
    build_aggregator, AggregatorError, AggregatorResult, AggregatorStats, IngestOutcome,
    IngestStatus, LatePolicy, ShardedAggregator, TermAggregator, TermCount, TrendAggregator,
    WindowConfig,
};

pub use tokenizer::{SimpleTokenizer, Tokenizer};

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use config::{Config, ConfigError, LoggingConfig, ReportSettings, WindowSettings};
