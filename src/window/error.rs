//! Aggregator error types
//!
//! The ingest and query paths never fail. Errors only arise while
//! constructing an aggregator or loading tokenizer resources.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building an aggregator
#[derive(Error, Debug)]
pub enum AggregatorError {
    /// Window parameters are inconsistent
    #[error("Invalid window configuration: {0}")]
    InvalidConfig(String),

    /// Tokenizer resource directory is missing or unreadable
    #[error("Tokenizer resources unavailable at {path:?}: {reason}")]
    TokenizerResources { path: PathBuf, reason: String },

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for aggregator construction
pub type AggregatorResult<T> = Result<T, AggregatorError>;
