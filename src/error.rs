//! Error types
//!
//! None of these ever end a game: callers log them and fall back.

use thiserror::Error;

/// Key-value store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Invalid or unparsable tuning data
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("tuning json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("tuning io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid tuning value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl TuningError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Ad network failures (always recovered with the placeholder ad)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdError {
    #[error("no ad fill")]
    NoFill,

    #[error("ad network error: {0}")]
    Network(String),
}

/// Commentary service failures (always recovered with a canned line)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommentaryError {
    #[error("commentary request failed: {0}")]
    Request(String),

    #[error("commentary request timed out")]
    Timeout,

    #[error("commentary provider busy")]
    Busy,
}
