//! The remote classification seam.
//!
//! The mapper never reaches for credentials or environment state itself;
//! callers inject whatever implementation they have, or [`NoopClassifier`]
//! when no service is configured.

use async_trait::async_trait;

use crmsync_model::{ColumnSample, FieldMapping, TargetField};

use crate::error::ClassifierError;

/// A remote learned-classification capability.
///
/// Implementations receive the column headings, at most
/// [`crmsync_model::MAX_SAMPLE_VALUES`] sample values per column, and the
/// fixed target vocabulary, and reply with one mapping suggestion per
/// column they can place.
#[async_trait]
pub trait ClassifierService: Send + Sync {
    /// Whether calling [`classify`](Self::classify) can ever succeed.
    ///
    /// The mapper skips the remote call entirely when this is `false`.
    fn is_configured(&self) -> bool;

    /// Classify the given columns against the vocabulary.
    async fn classify(
        &self,
        columns: &[ColumnSample],
        vocabulary: &[TargetField],
    ) -> Result<Vec<FieldMapping>, ClassifierError>;
}

/// A classifier that is never configured. The mapper degrades to rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopClassifier;

#[async_trait]
impl ClassifierService for NoopClassifier {
    fn is_configured(&self) -> bool {
        false
    }

    async fn classify(
        &self,
        _columns: &[ColumnSample],
        _vocabulary: &[TargetField],
    ) -> Result<Vec<FieldMapping>, ClassifierError> {
        Err(ClassifierError::Unavailable)
    }
}
