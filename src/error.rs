//! Error types for the graph widget
//!
//! Malformed graph records are not errors: the normalizer drops or repairs
//! them and logs a warning. Only fetch and configuration failures surface here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    /// Server answered with a non-success status
    #[error("HTTP {status} while fetching {url}")]
    Http { status: u16, url: String },

    /// Request never completed (network, CORS, aborted fetch)
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body was not a graph payload
    #[error("failed to decode graph payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// Settings file could not be parsed
    #[error("invalid graph settings: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GraphError>;
