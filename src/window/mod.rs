//! Sliding-window term aggregation
//!
//! This module is the core of trendwatch:
//!
//! - **types**: Core data types (TermCount, WindowConfig, LatePolicy)
//! - **interner**: Term text <-> compact identifier tables
//! - **bucket**: Time buckets, the global aggregate and the window slider
//! - **topk**: Bounded min-heap top-K selection
//! - **aggregator**: Single-lock facade (`TermAggregator`)
//! - **sharded**: Hash-partitioned facade (`ShardedAggregator`)
//! - **error**: Error types
//!
//! # Architecture
//!
//! ```text
//! Write Path:
//!   text → Tokenizer → [lock] Interner → tail bucket + aggregate → Slider
//!
//! Read Path:
//!   [shared lock] aggregate → Top-K heap → Interner::resolve → ranked terms
//! ```
//!
//! # Example
//!
//! ```rust
//! use trendwatch::window::{TermAggregator, TrendAggregator, WindowConfig};
//!
//! let agg = TermAggregator::with_default_tokenizer(WindowConfig::new(10, 1)).unwrap();
//! agg.ingest("the cat sat", 0);
//! agg.ingest("cat dog run", 5_000);
//! agg.ingest("cat cat cat", 11_000);
//!
//! let top = agg.query_top_k(2);
//! assert_eq!(top[0].term, "cat");
//! assert_eq!(top[0].count, 4);
//! ```

pub mod aggregator;
pub mod bucket;
pub mod error;
pub mod interner;
pub mod sharded;
pub mod topk;
pub mod types;

use std::sync::Arc;

use crate::tokenizer::Tokenizer;

// Re-export commonly used types
pub use aggregator::{TermAggregator, TrendAggregator};
pub use bucket::{BucketWindow, TimeBucket};
pub use error::{AggregatorError, AggregatorResult};
pub use interner::TermInterner;
pub use sharded::ShardedAggregator;
pub use topk::{merge_top_k, select_top_k};
pub use types::{
    AggregatorStats, IngestOutcome, IngestStatus, LatePolicy, TermCount, TermId, WindowConfig,
    UNKNOWN_TERM,
};

/// Build a single-lock aggregator for one shard, a sharded one otherwise
pub fn build_aggregator(
    tokenizer: Arc<dyn Tokenizer>,
    config: WindowConfig,
    shards: usize,
) -> AggregatorResult<Arc<dyn TrendAggregator>> {
    if shards <= 1 {
        Ok(Arc::new(TermAggregator::new(tokenizer, config)?))
    } else {
        Ok(Arc::new(ShardedAggregator::new(tokenizer, config, shards)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::SimpleTokenizer;

    #[test]
    fn test_build_aggregator_picks_layout() {
        let tokenizer: Arc<dyn Tokenizer> = Arc::new(SimpleTokenizer::new());
        let single = build_aggregator(Arc::clone(&tokenizer), WindowConfig::new(10, 1), 1).unwrap();
        let sharded = build_aggregator(tokenizer, WindowConfig::new(10, 1), 4).unwrap();

        for agg in [single, sharded] {
            agg.ingest("the cat sat", 0);
            agg.ingest("cat dog run", 5_000);
            agg.ingest("cat cat cat", 11_000);
            assert_eq!(agg.query_top_k(1), vec![TermCount::new("cat", 4)]);
        }
    }

    #[test]
    fn test_build_aggregator_validates() {
        let tokenizer: Arc<dyn Tokenizer> = Arc::new(SimpleTokenizer::new());
        assert!(build_aggregator(tokenizer, WindowConfig::new(1, 5), 1).is_err());
    }
}
