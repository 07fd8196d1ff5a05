//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use serde::{Deserialize, Serialize};

use crate::window::{AggregatorStats, IngestStatus, LatePolicy, TermCount};

// ============================================
// INGEST DTOs
// ============================================

/// Single message ingest request
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    /// Raw message text
    pub content: String,
    /// Optional timestamp (ms since epoch), defaults to now
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// Single message ingest response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// What happened to the message
    pub status: IngestStatus,
    /// Timestamp used for the message
    pub timestamp: i64,
    /// Bucket the message was aligned to (seconds)
    pub aligned_secs: i64,
    /// Term occurrences counted
    pub counted: usize,
}

/// Batch ingest request
#[derive(Debug, Deserialize)]
pub struct BatchMessageRequest {
    /// Messages to ingest, in order
    pub messages: Vec<MessageRequest>,
}

/// Batch ingest response
#[derive(Debug, Serialize)]
pub struct BatchMessageResponse {
    /// Status: "ok" or "partial"
    pub status: String,
    /// Messages applied to the window
    pub accepted: usize,
    /// Messages with no terms
    pub empty: usize,
    /// Messages dropped as late
    pub dropped_late: usize,
    /// Term occurrences counted across the batch
    pub counted: usize,
    /// Errors for rejected messages
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<BatchError>,
}

/// Error for a single message in a batch
#[derive(Debug, Serialize)]
pub struct BatchError {
    /// Index of the failed message
    pub index: usize,
    /// Error message
    pub error: String,
}

// ============================================
// QUERY DTOs
// ============================================

/// Query string for the trending endpoint
#[derive(Debug, Default, Deserialize)]
pub struct TrendingQuery {
    /// Number of terms wanted; zero or negative yields an empty list
    #[serde(default)]
    pub k: Option<i64>,
}

/// Current ranking
#[derive(Debug, Serialize)]
pub struct TrendingResponse {
    /// Window duration in seconds
    pub window_secs: i64,
    /// Bucket width in seconds
    pub bucket_step_secs: i64,
    /// Requested k
    pub k: i64,
    /// Ranked terms, highest count first
    pub terms: Vec<TermCount>,
    /// Server time of the query (ms since epoch)
    pub generated_at: i64,
}

/// Aggregator statistics
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub window_secs: i64,
    pub bucket_step_secs: i64,
    pub late_policy: LatePolicy,
    #[serde(flatten)]
    pub stats: AggregatorStats,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health status
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy"
    pub status: String,
    /// Buckets currently held
    pub buckets: usize,
    /// Terms currently ranked
    pub active_terms: usize,
    /// Server uptime
    pub uptime_seconds: u64,
    /// Crate version
    pub version: String,
}
