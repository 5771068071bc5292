//! Error taxonomy shared by the fetcher, store and notifier.

use reqwest::StatusCode;

pub type Result<T> = std::result::Result<T, StatusBotError>;

#[derive(Debug, thiserror::Error)]
pub enum StatusBotError {
    /// The status service answered with a non-success status code.
    #[error("status service returned {status}: {body}")]
    UpstreamUnavailable { status: StatusCode, body: String },

    /// The status service answered 2xx but the body was not the expected shape.
    #[error("status service payload could not be decoded: {reason}")]
    InvalidUpstreamPayload { reason: String, body: String },

    #[error("status store failure: {0}")]
    Persistence(#[from] rusqlite::Error),

    /// Post creation still failing after the retry budget was spent.
    #[error("post creation failed after {attempts} attempt(s), last status {status}: {body}")]
    PostCreationFailure {
        attempts: u32,
        status: StatusCode,
        body: String,
    },

    #[error("post publish failed with {status}: {body}")]
    PostPublishFailure { status: StatusCode, body: String },

    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("json encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl StatusBotError {
    /// Failures that end the cycle instead of being reported and skipped.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StatusBotError::Persistence(_) | StatusBotError::Config(_))
    }
}
