//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::window::TrendAggregator;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Sliding-window aggregator receiving messages and answering queries
    pub aggregator: Arc<dyn TrendAggregator>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(aggregator: Arc<dyn TrendAggregator>, config: ApiConfig) -> Self {
        Self {
            aggregator,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Terms returned when a query gives no k
    pub default_k: usize,
    /// Largest k a query may ask for
    pub max_k: usize,
    /// Maximum messages per batch request
    pub max_batch: usize,
    /// Maximum message length in bytes
    pub max_content_len: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8090,
            default_k: 10,
            max_k: 1000,
            max_batch: 10_000,
            max_content_len: 64 * 1024, // 64KB
        }
    }
}

impl ApiConfig {
    /// Create config with custom host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
