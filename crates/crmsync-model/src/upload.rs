//! Upload outcomes and duplicate-resolution decisions.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::duplicate::DuplicateMatch;
use crate::field::TargetField;

/// Classification of a per-record upload failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordErrorKind {
    /// The remote rejected the record for a non-duplicate reason.
    Validation,
    /// The remote's own duplicate rules fired at write time.
    DuplicateDetected,
    /// Network failure or timeout while writing.
    Transport,
    /// Anything the other classes do not cover.
    Unexpected,
}

/// One record's failure, with enough context for resubmission or display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordError {
    /// 1-based row number within the submitted batch.
    pub row: usize,
    /// Fields the remote named, if any.
    pub fields: Vec<TargetField>,
    pub kind: RecordErrorKind,
    /// Machine-readable remote error code, if one was returned.
    pub code: Option<String>,
    pub message: String,
}

/// Aggregated outcome of one upload attempt, merged across all batches.
///
/// Counters only move through [`record_success`](Self::record_success),
/// [`record_failure`](Self::record_failure), and [`merge`](Self::merge),
/// which keep `successful + failed == processed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadBatchResult {
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<RecordError>,
    /// Duplicates surfaced at write time by the remote's own rules.
    pub duplicates: Vec<DuplicateMatch>,
}

impl UploadBatchResult {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one record as written.
    pub fn record_success(&mut self) {
        self.processed += 1;
        self.successful += 1;
    }

    /// Count one record as failed and keep its error.
    pub fn record_failure(&mut self, error: RecordError) {
        self.processed += 1;
        self.failed += 1;
        self.errors.push(error);
    }

    /// Attach write-time duplicate evidence for an already-failed record.
    pub fn record_duplicate(&mut self, matched: DuplicateMatch) {
        self.duplicates.push(matched);
    }

    /// Fold another batch's result into this one.
    pub fn merge(&mut self, other: UploadBatchResult) {
        self.processed += other.processed;
        self.successful += other.successful;
        self.failed += other.failed;
        self.errors.extend(other.errors);
        self.duplicates.extend(other.duplicates);
    }

    /// Fraction of processed records written, 0.0 when nothing processed.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.processed == 0 {
            0.0
        } else {
            self.successful as f64 / self.processed as f64
        }
    }
}

/// How the caller wants a detected-duplicates situation handled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ResolutionDecision {
    /// Abort the job; nothing is written.
    Cancel,
    /// Upload only the records without detected duplicates.
    Skip,
    /// Copy selected fields onto the best existing match per record.
    Update {
        /// Record number → fields to copy. An empty set is a no-op for
        /// that record, not an error.
        selected: BTreeMap<usize, BTreeSet<TargetField>>,
    },
}
