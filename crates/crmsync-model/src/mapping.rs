//! Column-to-field mapping types.

use serde::{Deserialize, Serialize};

use crate::field::TargetField;

/// Maximum number of sample values carried per column.
///
/// Samples beyond this are truncated on construction; the remote
/// classification service never sees more.
pub const MAX_SAMPLE_VALUES: usize = 5;

/// A source column together with a few sample values.
///
/// Run-scoped: built from the export being imported and discarded after
/// mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSample {
    /// Column heading as it appears in the source export.
    pub name: String,
    /// Up to [`MAX_SAMPLE_VALUES`] representative values.
    pub values: Vec<String>,
}

impl ColumnSample {
    /// Build a sample, truncating to [`MAX_SAMPLE_VALUES`] values.
    #[must_use]
    pub fn new(name: impl Into<String>, mut values: Vec<String>) -> Self {
        values.truncate(MAX_SAMPLE_VALUES);
        Self {
            name: name.into(),
            values,
        }
    }
}

/// A resolved mapping from one source column to one target field.
///
/// Exactly one is produced per source column per run and it is immutable
/// once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Source column name.
    pub source_field: String,
    /// Target field, or [`TargetField::Unmapped`].
    pub target_field: TargetField,
    /// Heuristic confidence, 0 to 100. Not a calibrated probability.
    pub confidence: u8,
    /// Human-readable account of why this mapping was chosen.
    pub reasoning: String,
    /// Optional named transformation the importer should apply
    /// (e.g. "phone_digits", "title_case").
    pub suggested_transformation: Option<String>,
}

impl FieldMapping {
    /// An unmapped placeholder for a column nothing matched.
    #[must_use]
    pub fn unmapped(source_field: impl Into<String>) -> Self {
        Self {
            source_field: source_field.into(),
            target_field: TargetField::Unmapped,
            confidence: 0,
            reasoning: "no classification rule matched".to_string(),
            suggested_transformation: None,
        }
    }
}
