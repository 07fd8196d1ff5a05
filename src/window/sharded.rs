//! Sharded aggregator
//!
//! Splits the window state into independently locked shards so that
//! messages touching disjoint terms can be applied in parallel. Terms are
//! routed by hash; each shard has its own interner, buckets and aggregate.
//!
//! A shard only slides when it receives terms, so the newest aligned time
//! seen by any shard is kept in a shared watermark. Queries catch lagging
//! shards up to the watermark before reading them, then merge the
//! per-shard top-k candidates. Each shard is read under its own lock, so a
//! query is consistent per shard rather than across all shards.
//!
//! The late-arrival decision is taken once against the watermark. A shard
//! never rejects a message that passed it; a message is counted in full or
//! dropped as a whole.

use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use parking_lot::RwLock;
use std::sync::Arc;

use crate::tokenizer::Tokenizer;
use crate::window::aggregator::{TrendAggregator, WindowState};
use crate::window::error::{AggregatorError, AggregatorResult};
use crate::window::topk::merge_top_k;
use crate::window::types::{
    AggregatorStats, IngestOutcome, LatePolicy, TermCount, WindowConfig,
};

/// Watermark value before any message has been applied
const NO_WATERMARK: i64 = i64::MIN;

/// Hash-partitioned sliding-window term aggregator
pub struct ShardedAggregator {
    config: WindowConfig,
    /// Per-shard parameters (vocabulary limit split across shards)
    shard_config: WindowConfig,
    tokenizer: Arc<dyn Tokenizer>,
    shards: Vec<RwLock<WindowState>>,
    hasher: RandomState,
    /// Newest aligned time accepted by any shard
    watermark: AtomicI64,
    messages: AtomicU64,
    late_dropped: AtomicU64,
}

impl std::fmt::Debug for ShardedAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedAggregator")
            .field("config", &self.config)
            .field("shards", &self.shards.len())
            .finish_non_exhaustive()
    }
}

impl ShardedAggregator {
    pub fn new(
        tokenizer: Arc<dyn Tokenizer>,
        config: WindowConfig,
        shard_count: usize,
    ) -> AggregatorResult<Self> {
        config.validate()?;
        if shard_count == 0 {
            return Err(AggregatorError::InvalidConfig(
                "shard count must be positive".to_string(),
            ));
        }

        let mut shard_config = config.clone();
        if let Some(limit) = config.vocabulary_limit {
            shard_config.vocabulary_limit = Some(limit.div_ceil(shard_count));
        }

        Ok(Self {
            config,
            shard_config,
            tokenizer,
            shards: (0..shard_count).map(|_| RwLock::new(WindowState::new())).collect(),
            hasher: RandomState::new(),
            watermark: AtomicI64::new(NO_WATERMARK),
            messages: AtomicU64::new(0),
            late_dropped: AtomicU64::new(0),
        })
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard_of(&self, term: &str) -> usize {
        (self.hasher.hash_one(term) % self.shards.len() as u64) as usize
    }

    /// Slide a shard to the watermark if it has fallen behind
    fn catch_up(&self, index: usize) {
        let newest = self.watermark.load(Ordering::Acquire);
        if newest == NO_WATERMARK {
            return;
        }
        let shard = &self.shards[index];
        if shard.read().needs_slide(&self.shard_config, newest) {
            shard.write().advance(&self.shard_config, newest);
        }
    }

    /// Current window count for a single term
    pub fn count_of(&self, term: &str) -> u64 {
        let index = self.shard_of(term);
        self.catch_up(index);
        self.shards[index].read().count_of(term)
    }

    fn drop_late(&self, aligned: i64, watermark: i64) -> IngestOutcome {
        self.late_dropped.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            aligned,
            watermark,
            policy = %self.config.late_policy,
            "Dropped late message"
        );
        IngestOutcome::dropped(aligned)
    }
}

impl TrendAggregator for ShardedAggregator {
    fn ingest(&self, content: &str, timestamp_ms: i64) -> IngestOutcome {
        let terms = self.tokenizer.tokenize(content);
        if terms.is_empty() {
            return IngestOutcome::empty(self.config.align(timestamp_ms));
        }
        self.ingest_terms(&terms, timestamp_ms)
    }

    fn ingest_terms(&self, terms: &[String], timestamp_ms: i64) -> IngestOutcome {
        let aligned = self.config.align(timestamp_ms);
        if terms.is_empty() {
            return IngestOutcome::empty(aligned);
        }
        self.messages.fetch_add(1, Ordering::Relaxed);

        let watermark = self.watermark.load(Ordering::Acquire);
        let mut target = aligned;
        if watermark != NO_WATERMARK && aligned < watermark {
            match self.config.late_policy {
                LatePolicy::Drop => return self.drop_late(aligned, watermark),
                LatePolicy::ClampToLatest => target = watermark,
                LatePolicy::Backfill => {
                    if aligned <= watermark - self.config.window_duration_secs {
                        return self.drop_late(aligned, watermark);
                    }
                }
            }
        }
        let newest = self.watermark.fetch_max(target, Ordering::AcqRel).max(target);

        let mut routed: Vec<Vec<&str>> = vec![Vec::new(); self.shards.len()];
        for term in terms {
            if term.len() >= self.config.min_term_len {
                routed[self.shard_of(term)].push(term.as_str());
            }
        }

        // Accepted against the watermark; shards credit their tail rather
        // than reject if another writer has moved them on since.
        let mut counted = 0;
        for (index, shard_terms) in routed.iter().enumerate() {
            if shard_terms.is_empty() {
                continue;
            }
            counted += self.shards[index]
                .write()
                .apply(
                    &self.shard_config,
                    shard_terms.as_slice(),
                    target,
                    Some(newest),
                )
                .counted;
        }

        IngestOutcome::applied(aligned, counted)
    }

    fn query_top_k(&self, k: i64) -> Vec<TermCount> {
        let Ok(k) = usize::try_from(k) else {
            return Vec::new();
        };
        if k == 0 {
            return Vec::new();
        }

        let mut candidates = Vec::new();
        for index in 0..self.shards.len() {
            self.catch_up(index);
            candidates.extend(self.shards[index].read().top_k(k));
        }
        merge_top_k(candidates, k)
    }

    fn stats(&self) -> AggregatorStats {
        let mut stats = AggregatorStats::default();
        for index in 0..self.shards.len() {
            self.catch_up(index);
            stats.merge(&self.shards[index].read().stats());
        }
        stats.messages = self.messages.load(Ordering::Relaxed);
        stats.late_dropped = self.late_dropped.load(Ordering::Relaxed);
        stats
    }

    fn config(&self) -> &WindowConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::aggregator::TermAggregator;
    use crate::window::types::IngestStatus;
    use std::collections::HashMap;
    use std::thread;

    fn whitespace(text: &str) -> Vec<String> {
        text.split_whitespace().map(String::from).collect()
    }

    fn sharded(window: i64, step: i64, shards: usize) -> ShardedAggregator {
        sharded_with(WindowConfig::new(window, step), shards)
    }

    fn sharded_with(config: WindowConfig, shards: usize) -> ShardedAggregator {
        ShardedAggregator::new(Arc::new(whitespace), config, shards).unwrap()
    }

    fn as_map(terms: Vec<TermCount>) -> HashMap<String, u64> {
        terms.into_iter().map(|t| (t.term, t.count)).collect()
    }

    #[test]
    fn test_rejects_zero_shards() {
        let result =
            ShardedAggregator::new(Arc::new(whitespace), WindowConfig::new(10, 1), 0);
        assert!(matches!(result, Err(AggregatorError::InvalidConfig(_))));
    }

    #[test]
    fn test_reference_scenario() {
        let agg = sharded(10, 1, 4);
        assert!(agg.query_top_k(3).is_empty());

        agg.ingest("the cat sat", 0);
        agg.ingest("cat dog run", 5_000);
        agg.ingest("cat cat cat", 11_000);

        assert_eq!(agg.count_of("sat"), 0);
        let top = agg.query_top_k(2);
        assert_eq!(top[0], TermCount::new("cat", 4));
        assert_eq!(top[1].count, 1);
        assert!(agg.query_top_k(-1).is_empty());
    }

    #[test]
    fn test_matches_single_lock_aggregator() {
        let single = TermAggregator::new(Arc::new(whitespace), WindowConfig::new(15, 3)).unwrap();
        let multi = sharded(15, 3, 8);
        let words = ["red", "green", "blue", "cyan", "magenta", "yellow", "black"];

        for i in 0..300_i64 {
            let text = format!(
                "{} {} {}",
                words[(i % 7) as usize],
                words[(i * 2 % 7) as usize],
                words[(i * i % 7) as usize]
            );
            single.ingest(&text, i * 250);
            multi.ingest(&text, i * 250);
        }

        assert_eq!(
            as_map(single.query_top_k(i64::MAX)),
            as_map(multi.query_top_k(i64::MAX))
        );
        assert_eq!(single.stats().window_total, multi.stats().window_total);
    }

    #[test]
    fn test_idle_shard_catches_up_on_query() {
        let agg = sharded(10, 1, 16);
        agg.ingest("lonely", 0);
        // only the shard owning "fresh" sees this message
        agg.ingest("fresh", 30_000);

        let top = as_map(agg.query_top_k(10));
        assert!(!top.contains_key("lonely"));
        assert_eq!(top.get("fresh"), Some(&1));
    }

    #[test]
    fn test_late_drop_uses_global_watermark() {
        let agg = sharded(60, 1, 4);
        agg.ingest("fresh", 10_000);
        let outcome = agg.ingest("stale", 5_000);

        assert_eq!(outcome.status, IngestStatus::DroppedLate);
        assert_eq!(agg.count_of("stale"), 0);
        let stats = agg.stats();
        assert_eq!(stats.late_dropped, 1);
        assert_eq!(stats.messages, 2);
    }

    #[test]
    fn test_concurrent_disjoint_writers() {
        let agg = Arc::new(sharded(3_600, 60, 8));
        let handles: Vec<_> = (0..4)
            .map(|writer| {
                let agg = Arc::clone(&agg);
                thread::spawn(move || {
                    let text = format!("writer{} common", writer);
                    for _ in 0..200 {
                        agg.ingest(&text, 0);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(agg.count_of("common"), 800);
        for writer in 0..4 {
            assert_eq!(agg.count_of(&format!("writer{}", writer)), 200);
        }
        assert_eq!(agg.query_top_k(1), vec![TermCount::new("common", 800)]);
    }

    #[test]
    fn test_late_message_clamped() {
        let config = WindowConfig::new(60, 1).late_policy(LatePolicy::ClampToLatest);
        let agg = sharded_with(config, 4);
        agg.ingest("fresh", 10_000);
        let outcome = agg.ingest("stale", 5_000);

        assert_eq!(outcome.status, IngestStatus::Applied);
        assert_eq!(agg.count_of("stale"), 1);
        let stats = agg.stats();
        assert_eq!(stats.oldest_bucket, Some(10));
        assert_eq!(stats.newest_bucket, Some(10));
        assert_eq!(stats.late_dropped, 0);
    }

    #[test]
    fn test_late_message_backfilled() {
        let config = WindowConfig::new(60, 1).late_policy(LatePolicy::Backfill);
        let agg = sharded_with(config, 4);
        agg.ingest("fresh", 10_000);
        let outcome = agg.ingest("stale", 5_000);

        assert_eq!(outcome.status, IngestStatus::Applied);
        assert_eq!(agg.count_of("stale"), 1);
        assert_eq!(agg.stats().oldest_bucket, Some(5));

        // expires by its own slot time
        agg.ingest("later", 65_000);
        assert_eq!(agg.count_of("stale"), 0);
        assert_eq!(agg.count_of("fresh"), 1);
    }

    #[test]
    fn test_backfill_older_than_window_dropped() {
        let config = WindowConfig::new(60, 1).late_policy(LatePolicy::Backfill);
        let agg = sharded_with(config, 4);
        agg.ingest("fresh", 70_000);
        let outcome = agg.ingest("stale", 5_000);

        assert_eq!(outcome.status, IngestStatus::DroppedLate);
        assert_eq!(agg.count_of("stale"), 0);
        assert_eq!(agg.stats().late_dropped, 1);
    }

    #[test]
    fn test_vocabulary_limit_split_across_shards() {
        let config = WindowConfig::new(5, 1).vocabulary_limit(3);
        let agg = sharded_with(config, 4);
        assert_eq!(agg.shard_config.vocabulary_limit, Some(1));
        assert_eq!(agg.config().vocabulary_limit, Some(3));

        let burst: Vec<String> = (0..40).map(|i| format!("term{}", i)).collect();
        agg.ingest(&burst.join(" "), 0);
        agg.ingest("four five", 10_000);

        // every shard holding more than one expired term has compacted
        let stats = agg.stats();
        assert_eq!(stats.active_terms, 2);
        assert!(stats.vocabulary <= 2 + agg.shard_count());
        assert_eq!(agg.count_of("term0"), 0);
        assert_eq!(agg.count_of("four"), 1);
    }

    #[test]
    fn test_concurrent_late_writers_keep_counts_exact() {
        let agg = Arc::new(sharded(3_600, 1, 64));
        let words = ["alpha", "bravo", "charlie", "delta", "echo", "foxtrot"];
        let text = words.join(" ");

        let handles: Vec<_> = (0..8_i64)
            .map(|writer| {
                let agg = Arc::clone(&agg);
                let text = text.clone();
                thread::spawn(move || {
                    let mut outcomes = Vec::new();
                    for i in 0..500_i64 {
                        // writers run slightly out of step with each other
                        let ts = (i * 4 + writer % 3) * 1_000;
                        outcomes.push(agg.ingest(&text, ts));
                    }
                    outcomes
                })
            })
            .collect();

        let mut dropped = 0;
        let mut counted = 0;
        for handle in handles {
            for outcome in handle.join().unwrap() {
                match outcome.status {
                    IngestStatus::DroppedLate => dropped += 1,
                    IngestStatus::Applied => {
                        // all or nothing per message
                        assert_eq!(outcome.counted, words.len());
                        counted += outcome.counted as u64;
                    }
                    IngestStatus::Empty => panic!("unexpected empty outcome"),
                }
            }
        }

        let stats = agg.stats();
        assert_eq!(stats.messages, 4_000);
        assert_eq!(stats.late_dropped, dropped);
        assert_eq!(stats.terms_counted, counted);
        assert_eq!(stats.window_total, counted);
    }
}
