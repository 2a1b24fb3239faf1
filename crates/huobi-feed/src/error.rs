//! Feed error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid payload on {channel}: {reason}")]
    InvalidPayload { channel: String, reason: String },
}

impl FeedError {
    pub fn invalid(channel: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            channel: channel.to_string(),
            reason: reason.into(),
        }
    }
}

pub type FeedResult<T> = Result<T, FeedError>;
