//! Periodic trend reporting
//!
//! Background task that logs the current ranking at a fixed interval, so a
//! deployment without a dashboard still leaves a record of what trended.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

use crate::config::ReportSettings;
use crate::window::{TermCount, TrendAggregator};

/// Render a ranking as `term(count), term(count), ...`
pub fn format_ranking(terms: &[TermCount]) -> String {
    if terms.is_empty() {
        return "(no terms in window)".to_string();
    }
    terms
        .iter()
        .map(|t| format!("{}({})", t.term, t.count))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Log one report and return the ranking it described
pub fn report_once(aggregator: &dyn TrendAggregator, k: usize) -> Vec<TermCount> {
    let top = aggregator.query_top_k(i64::try_from(k).unwrap_or(i64::MAX));
    let stats = aggregator.stats();

    tracing::info!(
        k,
        buckets = stats.buckets,
        active_terms = stats.active_terms,
        late_dropped = stats.late_dropped,
        "Trending: {}",
        format_ranking(&top)
    );

    top
}

/// Start the reporter; abort the handle to stop it
pub fn spawn_reporter(
    aggregator: Arc<dyn TrendAggregator>,
    settings: &ReportSettings,
) -> tokio::task::JoinHandle<()> {
    let period = Duration::from_secs(settings.interval_secs.max(1));
    let k = settings.k;

    tokio::spawn(async move {
        let mut ticker = interval(period);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            report_once(aggregator.as_ref(), k);
        }
    })
}
