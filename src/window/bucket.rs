//! Time-bucketed counter and window slider
//!
//! Buckets are kept in a `VecDeque` ordered by aligned timestamp, so the
//! slider pops from the front and new slots are pushed at the back. The
//! global aggregate is updated in lock-step with every bucket mutation:
//! for every identifier it holds, its value equals the sum of that
//! identifier's counts across the buckets currently held.

use std::collections::{HashMap, VecDeque};

use crate::window::types::{LatePolicy, TermId};

/// Term counts for one aligned time slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeBucket {
    /// Bucket start in seconds, floor-aligned to the bucket step
    pub align_timestamp: i64,
    /// Occurrences per term within this slot
    pub counts: HashMap<TermId, u64>,
}

impl TimeBucket {
    pub fn new(align_timestamp: i64) -> Self {
        Self {
            align_timestamp,
            counts: HashMap::new(),
        }
    }

    /// Total occurrences held by this bucket
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

/// Where an ingestion should be credited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Index into the bucket sequence
    Bucket(usize),
    /// The message falls outside what the late policy accepts
    Rejected,
}

/// Ordered buckets plus the global aggregate they sum to
#[derive(Debug, Default)]
pub struct BucketWindow {
    buckets: VecDeque<TimeBucket>,
    global: HashMap<TermId, u64>,
}

impl BucketWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick (creating if needed) the bucket for `aligned`
    ///
    /// In-order messages reuse the tail bucket or append a new one. Messages
    /// older than the tail are placed according to `policy`; `window_secs`
    /// bounds how far back `Backfill` may reach.
    pub fn place(&mut self, aligned: i64, policy: LatePolicy, window_secs: i64) -> Placement {
        let tail = match self.buckets.back() {
            None => {
                self.buckets.push_back(TimeBucket::new(aligned));
                return Placement::Bucket(0);
            }
            Some(tail) => tail.align_timestamp,
        };

        if aligned == tail {
            return Placement::Bucket(self.buckets.len() - 1);
        }

        if aligned > tail {
            self.buckets.push_back(TimeBucket::new(aligned));
            return Placement::Bucket(self.buckets.len() - 1);
        }

        match policy {
            LatePolicy::Drop => Placement::Rejected,
            LatePolicy::ClampToLatest => Placement::Bucket(self.buckets.len() - 1),
            LatePolicy::Backfill => {
                if aligned <= tail - window_secs {
                    return Placement::Rejected;
                }
                match self
                    .buckets
                    .binary_search_by_key(&aligned, |b| b.align_timestamp)
                {
                    Ok(idx) => Placement::Bucket(idx),
                    Err(idx) => {
                        self.buckets.insert(idx, TimeBucket::new(aligned));
                        Placement::Bucket(idx)
                    }
                }
            }
        }
    }

    /// Count one occurrence of `id` in the bucket at `index`
    pub fn increment(&mut self, index: usize, id: TermId) {
        if let Some(bucket) = self.buckets.get_mut(index) {
            *bucket.counts.entry(id).or_insert(0) += 1;
            *self.global.entry(id).or_insert(0) += 1;
        }
    }

    /// Retire every bucket at or before `newest - window_secs`
    ///
    /// Returns the number of buckets removed.
    pub fn slide(&mut self, newest: i64, window_secs: i64) -> usize {
        let expire_threshold = newest - window_secs;
        let mut expired = 0;

        while let Some(front) = self.buckets.front() {
            if front.align_timestamp > expire_threshold {
                break;
            }
            if let Some(bucket) = self.buckets.pop_front() {
                self.retire(&bucket);
                expired += 1;
            }
        }

        expired
    }

    fn retire(&mut self, bucket: &TimeBucket) {
        for (id, &count) in &bucket.counts {
            if let Some(total) = self.global.get_mut(id) {
                if *total <= count {
                    self.global.remove(id);
                } else {
                    *total -= count;
                }
            }
        }
        tracing::trace!(
            bucket = bucket.align_timestamp,
            terms = bucket.counts.len(),
            "Expired bucket"
        );
    }

    /// Whether sliding to `newest` would retire anything
    pub fn needs_slide(&self, newest: i64, window_secs: i64) -> bool {
        self.buckets
            .front()
            .map(|b| b.align_timestamp <= newest - window_secs)
            .unwrap_or(false)
    }

    /// Current totals per term
    pub fn global(&self) -> &HashMap<TermId, u64> {
        &self.global
    }

    /// Current total for one term
    pub fn count(&self, id: TermId) -> u64 {
        self.global.get(&id).copied().unwrap_or(0)
    }

    pub fn buckets(&self) -> impl Iterator<Item = &TimeBucket> {
        self.buckets.iter()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Aligned time of the oldest bucket
    pub fn oldest(&self) -> Option<i64> {
        self.buckets.front().map(|b| b.align_timestamp)
    }

    /// Aligned time of the newest bucket
    pub fn newest(&self) -> Option<i64> {
        self.buckets.back().map(|b| b.align_timestamp)
    }
}
