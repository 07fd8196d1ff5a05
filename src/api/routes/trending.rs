//! Trending Routes
//!
//! - GET /api/v1/trending?k=N - Current top-K terms
//! - GET /api/v1/stats - Aggregator statistics

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::api::dto::{StatsResponse, TrendingQuery, TrendingResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;

/// GET /api/v1/trending
///
/// Ranked terms in the current window. `k` defaults to the configured
/// value; zero or negative returns an empty list.
pub async fn get_trending(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TrendingQuery>,
) -> ApiResult<Json<TrendingResponse>> {
    let k = query.k.unwrap_or(state.config.default_k as i64);
    if k > state.config.max_k as i64 {
        return Err(ApiError::Validation(format!(
            "k exceeds maximum of {}",
            state.config.max_k
        )));
    }

    let window = state.aggregator.config();
    Ok(Json(TrendingResponse {
        window_secs: window.window_duration_secs,
        bucket_step_secs: window.bucket_step_secs,
        k,
        terms: state.aggregator.query_top_k(k),
        generated_at: Utc::now().timestamp_millis(),
    }))
}

/// GET /api/v1/stats
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let window = state.aggregator.config();
    Json(StatsResponse {
        window_secs: window.window_duration_secs,
        bucket_step_secs: window.bucket_step_secs,
        late_policy: window.late_policy,
        stats: state.aggregator.stats(),
    })
}
