//! Top-K Selector
//!
//! A bounded min-heap of capacity k is filled in a single pass over the
//! global aggregate. Ranking is by count, then by ascending identifier
//! (first-seen order) so equal counts always come out in the same order.
//! Identifiers are resolved to text by the caller after selection.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

use crate::window::types::{TermCount, TermId};

/// Heap entry: greater means ranks higher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ranked {
    count: u64,
    id: TermId,
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.count
            .cmp(&other.count)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Select the `k` highest-ranked identifiers, highest first
pub fn select_top_k(global: &HashMap<TermId, u64>, k: usize) -> Vec<(TermId, u64)> {
    if k == 0 || global.is_empty() {
        return Vec::new();
    }

    let mut heap: BinaryHeap<Reverse<Ranked>> = BinaryHeap::with_capacity(k.min(global.len()));

    for (&id, &count) in global {
        if count == 0 {
            continue;
        }
        let candidate = Ranked { count, id };

        if heap.len() < k {
            heap.push(Reverse(candidate));
        } else if let Some(Reverse(min)) = heap.peek() {
            if candidate > *min {
                heap.pop();
                heap.push(Reverse(candidate));
            }
        }
    }

    // Pops come out lowest first
    let mut ranked = Vec::with_capacity(heap.len());
    while let Some(Reverse(entry)) = heap.pop() {
        ranked.push((entry.id, entry.count));
    }
    ranked.reverse();
    ranked
}

/// Merge already-resolved candidate lists into a single top-k
///
/// Used when candidates come from independent identifier spaces, so ties
/// are broken by term text instead of identifier.
pub fn merge_top_k<I>(candidates: I, k: usize) -> Vec<TermCount>
where
    I: IntoIterator<Item = TermCount>,
{
    if k == 0 {
        return Vec::new();
    }

    let mut merged: Vec<TermCount> = candidates.into_iter().filter(|c| c.count > 0).collect();
    merged.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.term.cmp(&b.term)));
    merged.truncate(k);
    merged
}
