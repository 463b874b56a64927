use thiserror::Error;

use crate::source::SourceError;

#[derive(Debug, Error)]
pub enum PageError {
    /// Required configuration missing or mutually exclusive options combined.
    /// Raised before the source is touched.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Query error: {0}")]
    Query(#[source] SourceError),

    #[error("Decode error: {0}")]
    Decode(#[from] bson::error::Error),

    #[error("deadline exceeded after {elapsed_ms} ms")]
    Timeout { elapsed_ms: u64 },

    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl PageError {
    pub(crate) fn validation(msg: &str) -> Self {
        Self::Validation(msg.to_string())
    }

    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
