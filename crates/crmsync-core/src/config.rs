//! Orchestration configuration.

use serde::{Deserialize, Serialize};

use crmsync_client::COMPOSITE_BATCH_LIMIT;

/// Tunables for one orchestrator instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Records per composite write call. Clamped to the remote's limit.
    pub batch_size: usize,
    /// Concurrent duplicate searches during the proactive check.
    pub search_concurrency: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            batch_size: COMPOSITE_BATCH_LIMIT,
            search_concurrency: 5,
        }
    }
}

impl UploadConfig {
    /// Batch size bounded by the remote composite limit, at least 1.
    #[must_use]
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.clamp(1, COMPOSITE_BATCH_LIMIT)
    }

    /// Search parallelism, at least 1.
    #[must_use]
    pub fn effective_search_concurrency(&self) -> usize {
        self.search_concurrency.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_size_is_clamped() {
        let config = UploadConfig {
            batch_size: 10_000,
            search_concurrency: 0,
        };
        assert_eq!(config.effective_batch_size(), COMPOSITE_BATCH_LIMIT);
        assert_eq!(config.effective_search_concurrency(), 1);

        let zero = UploadConfig {
            batch_size: 0,
            ..UploadConfig::default()
        };
        assert_eq!(zero.effective_batch_size(), 1);
    }
}
