//! Core data types for the trending-terms window
//!
//! - `TermId`: compact identifier handed out by the interner
//! - `TermCount`: one ranked entry returned by top-K queries
//! - `WindowConfig`: construction parameters for an aggregator
//! - `LatePolicy`: what happens to messages older than the newest bucket
//! - `IngestOutcome` and `AggregatorStats`: reporting types

use serde::{Deserialize, Serialize};

use crate::window::error::{AggregatorError, AggregatorResult};

/// Dense identifier assigned to a term on first sight. `0` is never assigned.
pub type TermId = u64;

/// Sentinel identifier meaning "no such term"
pub const UNKNOWN_TERM: TermId = 0;

/// A term together with its count inside the current window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermCount {
    pub term: String,
    pub count: u64,
}

impl TermCount {
    pub fn new(term: impl Into<String>, count: u64) -> Self {
        Self {
            term: term.into(),
            count,
        }
    }
}

/// Handling of messages whose aligned time precedes the newest bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LatePolicy {
    /// Discard the message
    #[default]
    Drop,
    /// Credit the terms to the newest bucket
    ClampToLatest,
    /// Credit the terms to the bucket for their own slot while it is still retained
    Backfill,
}

impl std::fmt::Display for LatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LatePolicy::Drop => write!(f, "drop"),
            LatePolicy::ClampToLatest => write!(f, "clamp_to_latest"),
            LatePolicy::Backfill => write!(f, "backfill"),
        }
    }
}

impl std::str::FromStr for LatePolicy {
    type Err = AggregatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "drop" => Ok(LatePolicy::Drop),
            "clamp_to_latest" | "clamp" => Ok(LatePolicy::ClampToLatest),
            "backfill" => Ok(LatePolicy::Backfill),
            other => Err(AggregatorError::InvalidConfig(format!(
                "unknown late policy '{}'",
                other
            ))),
        }
    }
}

// Config files accept the same spellings as the environment
impl<'de> Deserialize<'de> for LatePolicy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// Construction parameters for an aggregator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowConfig {
    /// Trailing span retained, in seconds
    pub window_duration_secs: i64,
    /// Width of one bucket, in seconds (default: 1)
    pub bucket_step_secs: i64,
    /// Terms shorter than this many UTF-8 bytes are ignored (default: 3)
    pub min_term_len: usize,
    /// Handling of out-of-order messages
    pub late_policy: LatePolicy,
    /// Rebuild the interner once it holds more terms than this
    pub vocabulary_limit: Option<usize>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_duration_secs: 300,
            bucket_step_secs: 1,
            min_term_len: 3,
            late_policy: LatePolicy::Drop,
            vocabulary_limit: None,
        }
    }
}

impl WindowConfig {
    pub fn new(window_duration_secs: i64, bucket_step_secs: i64) -> Self {
        Self {
            window_duration_secs,
            bucket_step_secs,
            ..Default::default()
        }
    }

    /// Builder method: set the late-arrival policy
    pub fn late_policy(mut self, policy: LatePolicy) -> Self {
        self.late_policy = policy;
        self
    }

    /// Builder method: bound the interner
    pub fn vocabulary_limit(mut self, limit: usize) -> Self {
        self.vocabulary_limit = Some(limit);
        self
    }

    /// Builder method: set the minimum counted term length
    pub fn min_term_len(mut self, len: usize) -> Self {
        self.min_term_len = len;
        self
    }

    pub fn validate(&self) -> AggregatorResult<()> {
        if self.window_duration_secs <= 0 {
            return Err(AggregatorError::InvalidConfig(
                "window duration must be positive".to_string(),
            ));
        }
        if self.bucket_step_secs <= 0 {
            return Err(AggregatorError::InvalidConfig(
                "bucket step must be positive".to_string(),
            ));
        }
        if self.bucket_step_secs > self.window_duration_secs {
            return Err(AggregatorError::InvalidConfig(format!(
                "bucket step ({}s) exceeds window duration ({}s)",
                self.bucket_step_secs, self.window_duration_secs
            )));
        }
        if self.vocabulary_limit == Some(0) {
            return Err(AggregatorError::InvalidConfig(
                "vocabulary limit must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Floor-align a millisecond timestamp to the start of its bucket, in seconds
    pub fn align(&self, timestamp_ms: i64) -> i64 {
        let secs = timestamp_ms.div_euclid(1000);
        secs.div_euclid(self.bucket_step_secs) * self.bucket_step_secs
    }
}

/// What an ingestion did with a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    /// Terms were counted (possibly zero after length filtering)
    Applied,
    /// The tokenizer produced nothing
    Empty,
    /// The message was older than the window accepts
    DroppedLate,
}

/// Result of a single ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestOutcome {
    pub status: IngestStatus,
    /// Aligned bucket time in seconds
    pub aligned_secs: i64,
    /// Number of term occurrences added to the window
    pub counted: usize,
}

impl IngestOutcome {
    pub(crate) fn empty(aligned_secs: i64) -> Self {
        Self {
            status: IngestStatus::Empty,
            aligned_secs,
            counted: 0,
        }
    }

    pub(crate) fn dropped(aligned_secs: i64) -> Self {
        Self {
            status: IngestStatus::DroppedLate,
            aligned_secs,
            counted: 0,
        }
    }

    pub(crate) fn applied(aligned_secs: i64, counted: usize) -> Self {
        Self {
            status: IngestStatus::Applied,
            aligned_secs,
            counted,
        }
    }
}

/// Snapshot of aggregator counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregatorStats {
    /// Messages handed to `ingest`
    pub messages: u64,
    /// Term occurrences counted since start
    pub terms_counted: u64,
    /// Messages discarded as late
    pub late_dropped: u64,
    /// Buckets currently held
    pub buckets: usize,
    /// Terms with a positive count in the window
    pub active_terms: usize,
    /// Terms known to the interner
    pub vocabulary: usize,
    /// Sum of all counts in the window
    pub window_total: u64,
    /// Aligned time of the oldest bucket held
    pub oldest_bucket: Option<i64>,
    /// Aligned time of the newest bucket held
    pub newest_bucket: Option<i64>,
}

impl AggregatorStats {
    /// Fold another snapshot into this one (used to combine shards)
    pub fn merge(&mut self, other: &AggregatorStats) {
        self.messages += other.messages;
        self.terms_counted += other.terms_counted;
        self.late_dropped += other.late_dropped;
        self.buckets += other.buckets;
        self.active_terms += other.active_terms;
        self.vocabulary += other.vocabulary;
        self.window_total += other.window_total;
        self.oldest_bucket = match (self.oldest_bucket, other.oldest_bucket) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.newest_bucket = match (self.newest_bucket, other.newest_bucket) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }
}

impl std::fmt::Display for AggregatorStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "messages={}, counted={}, late_dropped={}, buckets={}, active_terms={}, vocabulary={}, window_total={}",
            self.messages,
            self.terms_counted,
            self.late_dropped,
            self.buckets,
            self.active_terms,
            self.vocabulary,
            self.window_total
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_floors_to_step() {
        let config = WindowConfig::new(60, 5);
        assert_eq!(config.align(0), 0);
        assert_eq!(config.align(4_999), 0);
        assert_eq!(config.align(5_000), 5);
        assert_eq!(config.align(12_345), 10);
    }

    #[test]
    fn test_align_negative_timestamps_floor() {
        let config = WindowConfig::new(60, 5);
        assert_eq!(config.align(-1), -5);
        assert_eq!(config.align(-5_000), -5);
        assert_eq!(config.align(-5_001), -10);
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        assert!(WindowConfig::new(0, 1).validate().is_err());
        assert!(WindowConfig::new(10, 0).validate().is_err());
        assert!(WindowConfig::new(10, 20).validate().is_err());
        assert!(WindowConfig::new(10, 1).vocabulary_limit(0).validate().is_err());
        assert!(WindowConfig::new(10, 1).validate().is_ok());
    }

    #[test]
    fn test_late_policy_parse() {
        assert_eq!("drop".parse::<LatePolicy>().unwrap(), LatePolicy::Drop);
        assert_eq!("Backfill".parse::<LatePolicy>().unwrap(), LatePolicy::Backfill);
        assert_eq!(
            "clamp_to_latest".parse::<LatePolicy>().unwrap(),
            LatePolicy::ClampToLatest
        );
        assert!("sometimes".parse::<LatePolicy>().is_err());
    }

    #[test]
    fn test_late_policy_deserialize_matches_parse() {
        for (text, policy) in [
            ("\"clamp\"", LatePolicy::ClampToLatest),
            ("\"Clamp_To_Latest\"", LatePolicy::ClampToLatest),
            ("\"BACKFILL\"", LatePolicy::Backfill),
            ("\"drop\"", LatePolicy::Drop),
        ] {
            assert_eq!(serde_json::from_str::<LatePolicy>(text).unwrap(), policy);
        }
        assert!(serde_json::from_str::<LatePolicy>("\"sometimes\"").is_err());
        assert_eq!(
            serde_json::to_string(&LatePolicy::ClampToLatest).unwrap(),
            "\"clamp_to_latest\""
        );
    }

    #[test]
    fn test_stats_merge() {
        let mut a = AggregatorStats {
            messages: 3,
            buckets: 2,
            oldest_bucket: Some(10),
            newest_bucket: Some(20),
            ..Default::default()
        };
        let b = AggregatorStats {
            messages: 3,
            buckets: 1,
            oldest_bucket: Some(5),
            newest_bucket: None,
            ..Default::default()
        };
        a.merge(&b);
        assert_eq!(a.messages, 6);
        assert_eq!(a.buckets, 3);
        assert_eq!(a.oldest_bucket, Some(5));
        assert_eq!(a.newest_bucket, Some(20));
    }
}
