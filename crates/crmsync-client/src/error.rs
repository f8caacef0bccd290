//! Error types for remote CRM calls.

use thiserror::Error;

/// Errors from the CRM client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// Network failure or timeout.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote rejected the request for a non-duplicate reason.
    #[error("remote validation error [{code}]: {message}")]
    RemoteValidation { code: String, message: String },

    /// The remote's duplicate rules rejected a single-record write.
    #[error("duplicate detected: {message}")]
    DuplicateDetected { message: String },

    /// The remote replied with something that could not be decoded.
    #[error("malformed remote reply: {0}")]
    Parse(String),

    /// Non-success HTTP status outside the structured error envelope.
    #[error("remote API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// More records than one composite call accepts.
    #[error("composite batch of {len} exceeds the remote limit of {limit}")]
    BatchTooLarge { len: usize, limit: usize },
}

impl ClientError {
    /// Whether resubmitting the same request could plausibly succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Api { status: 500..=599, .. })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
