//! Error types for classification and caching.

use thiserror::Error;

/// Errors from the mapping cache.
///
/// Cache failures are never fatal: the mapper logs them and proceeds as if
/// the lookup missed or the write succeeded.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CacheError {
    /// Filesystem failure reading or writing a cache entry.
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored entry could not be decoded.
    #[error("cache entry decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors from the remote classification service.
///
/// All variants degrade to the rule-based result; none propagate past the
/// mapper.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClassifierError {
    /// No classification service is configured.
    #[error("no classification service configured")]
    Unavailable,

    /// Network failure or timeout reaching the service.
    #[error("classification transport error: {0}")]
    Transport(String),

    /// The service replied with something that could not be parsed.
    #[error("malformed classification reply: {0}")]
    Parse(String),
}
