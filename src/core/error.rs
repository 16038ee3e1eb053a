//! Error types for the dashboard core

use thiserror::Error;

/// Failures of backend payloads and user input handled by the core
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvoError {
    #[error("malformed JSON: {0}")]
    Json(String),

    #[error("cannot decode numeric buffer of dtype '{dtype}': {reason}")]
    Buffer { dtype: String, reason: String },

    #[error("series '{0}' not found")]
    MissingSeries(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// The backend answered but reported an `error` field
    #[error("{0}")]
    Backend(String),

    #[error("backend returned status {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Transport(String),
}

impl From<serde_json::Error> for EvoError {
    fn from(e: serde_json::Error) -> Self {
        EvoError::Json(e.to_string())
    }
}

/// A chart command the rendering widget refused to apply
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChartError {
    #[error("overlay {0} does not exist")]
    UnknownOverlay(u64),

    #[error("chart rejected command: {0}")]
    Rejected(String),
}
