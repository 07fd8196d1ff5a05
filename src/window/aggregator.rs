//! Aggregator Facade
//!
//! `TermAggregator` owns the interner, the bucket window and the global
//! aggregate behind a single `RwLock`. Ingestion tokenizes before taking
//! the lock and then applies the whole message under the write lock, so a
//! query (read lock) never sees half of a message.
//!
//! ```text
//! ingest:  text → Tokenizer → [write lock] intern → bucket += 1 → aggregate += 1 → slide
//! query:   [read lock] aggregate → bounded min-heap → resolve ids → ranked terms
//! ```

use parking_lot::RwLock;
use std::sync::Arc;

use crate::tokenizer::{SimpleTokenizer, Tokenizer};
use crate::window::bucket::{BucketWindow, Placement};
use crate::window::error::AggregatorResult;
use crate::window::interner::TermInterner;
use crate::window::topk::select_top_k;
use crate::window::types::{
    AggregatorStats, IngestOutcome, LatePolicy, TermCount, TermId, WindowConfig,
};

/// Common surface of the single-lock and sharded aggregators
pub trait TrendAggregator: Send + Sync {
    /// Tokenize `content` and count its terms at `timestamp_ms`
    fn ingest(&self, content: &str, timestamp_ms: i64) -> IngestOutcome;

    /// Count already-tokenized terms at `timestamp_ms`
    fn ingest_terms(&self, terms: &[String], timestamp_ms: i64) -> IngestOutcome;

    /// The `k` most frequent terms in the window, highest first
    ///
    /// Returns an empty list for `k <= 0`.
    fn query_top_k(&self, k: i64) -> Vec<TermCount>;

    /// Counter snapshot
    fn stats(&self) -> AggregatorStats;

    /// Window parameters this aggregator was built with
    fn config(&self) -> &WindowConfig;

    /// Ingest several `(content, timestamp_ms)` messages in order
    fn ingest_batch(&self, messages: &[(String, i64)]) -> Vec<IngestOutcome> {
        messages
            .iter()
            .map(|(content, ts)| self.ingest(content, *ts))
            .collect()
    }
}

/// Everything guarded by one aggregator lock
#[derive(Debug, Default)]
pub(crate) struct WindowState {
    interner: TermInterner,
    window: BucketWindow,
    messages: u64,
    terms_counted: u64,
    late_dropped: u64,
    /// Interner size that triggers the next compaction
    compact_at: Option<usize>,
}

impl WindowState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Apply one message's terms at `aligned`
    ///
    /// The window is slid to the newer of its own tail and `horizon`. A
    /// horizon marks a message the caller has already accepted, so it is
    /// never rejected here: if the tail has moved past `aligned`, the terms
    /// are credited to the tail bucket.
    pub(crate) fn apply<S: AsRef<str>>(
        &mut self,
        config: &WindowConfig,
        terms: &[S],
        aligned: i64,
        horizon: Option<i64>,
    ) -> IngestOutcome {
        if terms.is_empty() {
            return IngestOutcome::empty(aligned);
        }
        self.messages += 1;

        let placement = match (
            self.window
                .place(aligned, config.late_policy, config.window_duration_secs),
            horizon,
        ) {
            // accepted upstream, but this state's tail has already moved past it
            (Placement::Rejected, Some(_)) => self.window.place(
                aligned,
                LatePolicy::ClampToLatest,
                config.window_duration_secs,
            ),
            (placement, _) => placement,
        };

        let index = match placement {
            Placement::Bucket(index) => index,
            Placement::Rejected => {
                self.late_dropped += 1;
                tracing::debug!(
                    aligned,
                    newest = ?self.window.newest(),
                    policy = %config.late_policy,
                    "Dropped late message"
                );
                return IngestOutcome::dropped(aligned);
            }
        };

        let mut counted = 0;
        for term in terms {
            let term = term.as_ref();
            if term.len() < config.min_term_len {
                continue;
            }
            let id = self.interner.get_or_create(term);
            self.window.increment(index, id);
            counted += 1;
        }
        self.terms_counted += counted as u64;

        let newest = match (self.window.newest(), horizon) {
            (Some(tail), Some(h)) => tail.max(h),
            (tail, h) => tail.or(h).unwrap_or(aligned),
        };
        self.advance(config, newest);

        IngestOutcome::applied(aligned, counted)
    }

    /// Slide the window to `newest` and compact the interner if needed
    pub(crate) fn advance(&mut self, config: &WindowConfig, newest: i64) {
        let expired = self.window.slide(newest, config.window_duration_secs);
        if expired > 0 {
            tracing::debug!(
                expired,
                newest,
                remaining = self.window.len(),
                "Slid window"
            );
        }
        self.maybe_compact(config);
    }

    pub(crate) fn needs_slide(&self, config: &WindowConfig, newest: i64) -> bool {
        self.window.needs_slide(newest, config.window_duration_secs)
    }

    fn maybe_compact(&mut self, config: &WindowConfig) {
        let Some(limit) = config.vocabulary_limit else {
            return;
        };
        let threshold = self.compact_at.unwrap_or(limit);
        if self.interner.len() <= threshold {
            return;
        }

        let global = self.window.global();
        let removed = self.interner.retain(|id| global.contains_key(&id));
        let live = self.interner.len();
        let next = limit.max(live * 2);
        self.compact_at = Some(next);

        tracing::info!(removed, live, next_compaction = next, "Compacted term interner");
    }

    pub(crate) fn top_k(&self, k: usize) -> Vec<TermCount> {
        select_top_k(self.window.global(), k)
            .into_iter()
            .map(|(id, count)| TermCount::new(self.interner.resolve(id), count))
            .collect()
    }

    pub(crate) fn count_of(&self, term: &str) -> u64 {
        self.interner
            .get(term)
            .map(|id| self.window.count(id))
            .unwrap_or(0)
    }

    pub(crate) fn term_id(&self, term: &str) -> Option<TermId> {
        self.interner.get(term)
    }

    pub(crate) fn stats(&self) -> AggregatorStats {
        AggregatorStats {
            messages: self.messages,
            terms_counted: self.terms_counted,
            late_dropped: self.late_dropped,
            buckets: self.window.len(),
            active_terms: self.window.global().len(),
            vocabulary: self.interner.len(),
            window_total: self.window.global().values().sum(),
            oldest_bucket: self.window.oldest(),
            newest_bucket: self.window.newest(),
        }
    }

    #[cfg(test)]
    pub(crate) fn window(&self) -> &BucketWindow {
        &self.window
    }
}

/// Single-lock sliding-window term aggregator
pub struct TermAggregator {
    config: WindowConfig,
    tokenizer: Arc<dyn Tokenizer>,
    state: RwLock<WindowState>,
}

impl std::fmt::Debug for TermAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TermAggregator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TermAggregator {
    /// Create an aggregator with the given tokenizer
    pub fn new(tokenizer: Arc<dyn Tokenizer>, config: WindowConfig) -> AggregatorResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            tokenizer,
            state: RwLock::new(WindowState::new()),
        })
    }

    /// Create an aggregator using the built-in `SimpleTokenizer`
    pub fn with_default_tokenizer(config: WindowConfig) -> AggregatorResult<Self> {
        Self::new(Arc::new(SimpleTokenizer::new()), config)
    }

    /// Current window count for a single term
    pub fn count_of(&self, term: &str) -> u64 {
        self.state.read().count_of(term)
    }

    /// Identifier assigned to `term`, if it is interned
    pub fn term_id(&self, term: &str) -> Option<TermId> {
        self.state.read().term_id(term)
    }
}

impl TrendAggregator for TermAggregator {
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
        self.state.write().apply(&self.config, terms, aligned, None)
    }

    fn query_top_k(&self, k: i64) -> Vec<TermCount> {
        let Ok(k) = usize::try_from(k) else {
            return Vec::new();
        };
        if k == 0 {
            return Vec::new();
        }
        self.state.read().top_k(k)
    }

    fn stats(&self) -> AggregatorStats {
        self.state.read().stats()
    }

    fn config(&self) -> &WindowConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::types::IngestStatus;
    use std::collections::HashMap;
    use std::thread;

    fn whitespace(text: &str) -> Vec<String> {
        text.split_whitespace().map(String::from).collect()
    }

    fn aggregator(window: i64, step: i64) -> TermAggregator {
        TermAggregator::new(Arc::new(whitespace), WindowConfig::new(window, step)).unwrap()
    }

    fn recount(state: &WindowState) -> HashMap<TermId, u64> {
        let mut totals = HashMap::new();
        for bucket in state.window().buckets() {
            for (id, count) in &bucket.counts {
                *totals.entry(*id).or_insert(0) += count;
            }
        }
        totals
    }

    #[test]
    fn test_fresh_aggregator_is_empty() {
        let agg = aggregator(10, 1);
        for k in [-5, -1, 0, 1, 10, i64::MAX] {
            assert!(agg.query_top_k(k).is_empty());
        }
    }

    #[test]
    fn test_reference_scenario() {
        let agg = aggregator(10, 1);
        agg.ingest("the cat sat", 0);
        agg.ingest("cat dog run", 5_000);
        agg.ingest("cat cat cat", 11_000);

        // bucket 0 (the, cat, sat) expired at threshold 11 - 10 = 1
        assert_eq!(agg.count_of("sat"), 0);
        assert_eq!(agg.count_of("the"), 0);
        assert_eq!(
            agg.query_top_k(2),
            vec![TermCount::new("cat", 4), TermCount::new("dog", 1)]
        );
        assert!(agg.query_top_k(0).is_empty());
        assert!(agg.query_top_k(-1).is_empty());
    }

    #[test]
    fn test_short_terms_are_ignored() {
        let agg = aggregator(10, 1);
        let outcome = agg.ingest("a is ok cat", 0);
        assert_eq!(outcome.counted, 1);
        assert_eq!(agg.query_top_k(10), vec![TermCount::new("cat", 1)]);
    }

    #[test]
    fn test_length_is_measured_in_bytes() {
        let agg = aggregator(10, 1);
        // one ideograph is three UTF-8 bytes
        agg.ingest("热 é", 0);
        assert_eq!(agg.query_top_k(10), vec![TermCount::new("热", 1)]);
    }

    #[test]
    fn test_empty_message_is_noop() {
        let agg = aggregator(10, 1);
        let outcome = agg.ingest("   ", 1_000);
        assert_eq!(outcome.status, IngestStatus::Empty);
        assert_eq!(agg.stats(), AggregatorStats::default());
    }

    #[test]
    fn test_window_expires_old_terms() {
        let agg = aggregator(30, 5);
        agg.ingest("alpha beta", 0);
        agg.ingest("beta gamma", 20_000);
        agg.ingest("delta", 36_000);

        let terms: Vec<String> = agg.query_top_k(i64::MAX).into_iter().map(|t| t.term).collect();
        assert!(!terms.contains(&"alpha".to_string()));
        assert_eq!(agg.count_of("beta"), 1);
        assert_eq!(agg.count_of("gamma"), 1);
        assert_eq!(agg.count_of("delta"), 1);
    }

    #[test]
    fn test_aggregate_matches_buckets() {
        let agg = aggregator(20, 2);
        let words = ["alpha", "beta", "gamma", "delta", "epsilon"];
        for i in 0..200_i64 {
            let text = format!(
                "{} {} {}",
                words[(i % 5) as usize],
                words[(i * 3 % 5) as usize],
                words[(i * 7 % 5) as usize]
            );
            agg.ingest(&text, i * 700);

            let state = agg.state.read();
            assert_eq!(state.window().global(), &recount(&state));
        }
    }

    #[test]
    fn test_ids_survive_expiry() {
        let agg = aggregator(5, 1);
        agg.ingest("stable", 0);
        let id = agg.term_id("stable").unwrap();
        agg.ingest("other", 60_000);
        assert_eq!(agg.count_of("stable"), 0);
        agg.ingest("stable", 61_000);
        assert_eq!(agg.term_id("stable"), Some(id));
    }

    #[test]
    fn test_late_message_dropped_by_default() {
        let agg = aggregator(60, 1);
        agg.ingest("fresh", 10_000);
        let outcome = agg.ingest("stale", 5_000);

        assert_eq!(outcome.status, IngestStatus::DroppedLate);
        assert_eq!(agg.count_of("stale"), 0);
        assert_eq!(agg.stats().late_dropped, 1);
    }

    #[test]
    fn test_late_message_backfilled() {
        let config = WindowConfig::new(60, 1).late_policy(LatePolicy::Backfill);
        let agg = TermAggregator::new(Arc::new(whitespace), config).unwrap();
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
    fn test_late_message_clamped() {
        let config = WindowConfig::new(60, 1).late_policy(LatePolicy::ClampToLatest);
        let agg = TermAggregator::new(Arc::new(whitespace), config).unwrap();
        agg.ingest("fresh", 10_000);
        agg.ingest("stale", 5_000);

        assert_eq!(agg.count_of("stale"), 1);
        assert_eq!(agg.stats().buckets, 1);
    }

    #[test]
    fn test_accepted_message_credits_tail_instead_of_dropping() {
        let config = WindowConfig::new(60, 1);
        let mut state = WindowState::new();
        state.apply(&config, &["fresh"][..], 10, None);

        // the caller accepted this at horizon 10 before the tail moved on
        let outcome = state.apply(&config, &["stale"][..], 5, Some(10));

        assert_eq!(outcome.status, IngestStatus::Applied);
        assert_eq!(outcome.counted, 1);
        assert_eq!(state.count_of("stale"), 1);
        let stats = state.stats();
        assert_eq!(stats.late_dropped, 0);
        assert_eq!(stats.buckets, 1);
        assert_eq!(stats.newest_bucket, Some(10));
    }

    #[test]
    fn test_vocabulary_limit_compacts_expired_terms() {
        let config = WindowConfig::new(5, 1).vocabulary_limit(4);
        let agg = TermAggregator::new(Arc::new(whitespace), config).unwrap();

        agg.ingest("one two three", 0);
        agg.ingest("four five", 10_000);

        let stats = agg.stats();
        assert_eq!(stats.vocabulary, 2);
        assert_eq!(agg.term_id("one"), None);
        assert_eq!(agg.term_id("four"), Some(4));

        // a dropped term comes back with a fresh id
        agg.ingest("one", 11_000);
        assert_eq!(agg.term_id("one"), Some(6));
        assert_eq!(agg.query_top_k(1), vec![TermCount::new("four", 1)]);
    }

    #[test]
    fn test_stats() {
        let agg = aggregator(10, 1);
        agg.ingest("cat cat dog", 1_000);
        agg.ingest("dog", 3_000);

        let stats = agg.stats();
        assert_eq!(stats.messages, 2);
        assert_eq!(stats.terms_counted, 4);
        assert_eq!(stats.buckets, 2);
        assert_eq!(stats.active_terms, 2);
        assert_eq!(stats.vocabulary, 2);
        assert_eq!(stats.window_total, 4);
        assert_eq!(stats.oldest_bucket, Some(1));
        assert_eq!(stats.newest_bucket, Some(3));
    }

    #[test]
    fn test_ingest_batch() {
        let agg = aggregator(10, 1);
        let outcomes = agg.ingest_batch(&[
            ("cat dog".to_string(), 0),
            ("".to_string(), 0),
            ("cat".to_string(), 1_000),
        ]);
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[1].status, IngestStatus::Empty);
        assert_eq!(agg.count_of("cat"), 2);
    }

    #[test]
    fn test_rejects_invalid_config() {
        assert!(TermAggregator::with_default_tokenizer(WindowConfig::new(0, 1)).is_err());
    }

    #[test]
    fn test_concurrent_ingest_and_query() {
        let agg = Arc::new(aggregator(3_600, 1));
        let mut handles = Vec::new();

        for writer in 0..4_i64 {
            let agg = Arc::clone(&agg);
            handles.push(thread::spawn(move || {
                for i in 0..250_i64 {
                    agg.ingest("shared unique", 1_000 * writer + i);
                }
            }));
        }
        for _ in 0..2 {
            let agg = Arc::clone(&agg);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    let top = agg.query_top_k(2);
                    if let [first, second] = top.as_slice() {
                        // both terms come from the same message
                        assert_eq!(first.count, second.count);
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = agg.stats();
        assert_eq!(stats.messages, 1_000);
        // writers race, so some messages arrive behind the tail and are dropped
        assert_eq!(agg.count_of("shared") + stats.late_dropped, 1_000);
        assert_eq!(agg.count_of("shared"), agg.count_of("unique"));
    }
}
