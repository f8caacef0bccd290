//! Human-driven resolution of proactively detected duplicates.
//!
//! A job parked in `DuplicatesPendingResolution` is finished here with
//! one of three decisions: cancel everything, skip the matched records
//! and upload the rest, or copy selected fields onto the best existing
//! match per record.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crmsync_client::ClientError;
use crmsync_model::{
    DuplicateMatch, RecordError, RecordErrorKind, ResolutionDecision, UploadBatchResult,
};
use crmsync_transform::adapter::destination_name;

use crate::job::UploadJob;
use crate::orchestrator::{SourceRow, UploadOrchestrator};

/// Terminal outcome of a resolution.
#[derive(Debug)]
pub enum ResolutionOutcome {
    /// Job aborted; nothing was written.
    Cancelled,
    /// Matched records were excluded; the rest were uploaded.
    Skipped(UploadBatchResult),
    /// Selected fields were copied onto existing records.
    Updated(UploadBatchResult),
    /// The records could not be re-prepared; nothing was written.
    Failed(String),
}

/// Applies a [`ResolutionDecision`] to a parked job.
pub struct ResolutionWorkflow {
    orchestrator: Arc<UploadOrchestrator>,
}

impl ResolutionWorkflow {
    pub fn new(orchestrator: Arc<UploadOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Resolve a job parked with duplicates.
    ///
    /// `rows` must be the same source rows the job was submitted with;
    /// re-preparation is cheap because the column mapping is cached.
    pub async fn resolve(
        &self,
        decision: &ResolutionDecision,
        rows: &[SourceRow],
        job: &UploadJob,
        cancel: &CancellationToken,
    ) -> ResolutionOutcome {
        match decision {
            ResolutionDecision::Cancel => {
                info!(job = %job.id, "resolution: cancelled, nothing written");
                ResolutionOutcome::Cancelled
            }
            ResolutionDecision::Skip => self.skip(rows, job, cancel).await,
            ResolutionDecision::Update { selected } => self.update(rows, job, selected).await,
        }
    }

    /// Upload exactly the records without detected duplicates, keeping
    /// their original order and row numbering.
    async fn skip(
        &self,
        rows: &[SourceRow],
        job: &UploadJob,
        cancel: &CancellationToken,
    ) -> ResolutionOutcome {
        let prepared = match self.orchestrator.prepare_records(rows, job.object).await {
            Ok(prepared) => prepared,
            Err((row, message)) => {
                return ResolutionOutcome::Failed(format!("record {row}: {message}"));
            }
        };

        let matched: BTreeSet<usize> =
            job.duplicates.iter().map(|m| m.record_number).collect();

        let mut kept_candidates = Vec::new();
        let mut kept_adapted = Vec::new();
        let mut original_rows = Vec::new();
        for (index, (candidate, adapted)) in prepared
            .candidates
            .into_iter()
            .zip(prepared.adapted)
            .enumerate()
        {
            let row_number = index + 1;
            if matched.contains(&row_number) {
                continue;
            }
            kept_candidates.push(candidate);
            kept_adapted.push(adapted);
            original_rows.push(row_number);
        }

        info!(
            job = %job.id,
            skipped = matched.len(),
            uploading = kept_adapted.len(),
            "resolution: skipping matched records"
        );

        let mut result = self
            .orchestrator
            .upload_batches(&kept_candidates, &kept_adapted, job.object, cancel)
            .await;

        // Report errors against the caller's original row numbers, not
        // positions within the reduced upload.
        for error in &mut result.errors {
            if let Some(original) = original_rows.get(error.row - 1) {
                error.row = *original;
            }
        }
        for matched in &mut result.duplicates {
            if let Some(original) = original_rows.get(matched.record_number - 1) {
                matched.record_number = *original;
            }
        }

        ResolutionOutcome::Skipped(result)
    }

    /// Copy the caller-selected field subsets onto each record's best
    /// (lowest-priority) existing match via independent writes.
    async fn update(
        &self,
        rows: &[SourceRow],
        job: &UploadJob,
        selected: &BTreeMap<usize, BTreeSet<crmsync_model::TargetField>>,
    ) -> ResolutionOutcome {
        let prepared = match self.orchestrator.prepare_records(rows, job.object).await {
            Ok(prepared) => prepared,
            Err((row, message)) => {
                return ResolutionOutcome::Failed(format!("record {row}: {message}"));
            }
        };

        let mut result = UploadBatchResult::new();

        for (record_number, fields) in selected {
            if fields.is_empty() {
                // Explicitly a no-op, not an error.
                debug!(record = record_number, "empty field selection, skipping");
                continue;
            }

            let Some(best) = best_match(&job.duplicates, *record_number) else {
                warn!(
                    record = record_number,
                    "update requested for a record with no detected duplicate"
                );
                continue;
            };

            let Some(candidate) = prepared.candidates.get(record_number - 1) else {
                warn!(record = record_number, "update requested for an unknown record");
                continue;
            };

            let mut updates: BTreeMap<String, String> = BTreeMap::new();
            for field in fields {
                let Some(value) = candidate.non_empty(*field) else {
                    continue;
                };
                let Some(dest) = destination_name(job.object, *field) else {
                    continue;
                };
                updates.insert(dest.to_string(), value.to_string());
            }

            if updates.is_empty() {
                debug!(record = record_number, "no copyable values selected, skipping");
                continue;
            }

            match self
                .orchestrator
                .crm()
                .update(job.object, &best.existing_record_id, &updates)
                .await
            {
                Ok(()) => {
                    debug!(
                        record = record_number,
                        existing = %best.existing_record_id,
                        "existing record updated"
                    );
                    result.record_success();
                }
                Err(e) => {
                    // Already-applied updates stay applied; there is no
                    // rollback across records.
                    result.record_failure(RecordError {
                        row: *record_number,
                        fields: fields.iter().copied().collect(),
                        kind: classify_client_error(&e),
                        code: None,
                        message: e.to_string(),
                    });
                }
            }
        }

        ResolutionOutcome::Updated(result)
    }
}

/// The strongest match for a record: lowest priority, first on ties.
fn best_match(duplicates: &[DuplicateMatch], record_number: usize) -> Option<&DuplicateMatch> {
    duplicates
        .iter()
        .filter(|m| m.record_number == record_number)
        .min_by_key(|m| m.match_priority)
}

fn classify_client_error(error: &ClientError) -> RecordErrorKind {
    match error {
        ClientError::Transport(_) => RecordErrorKind::Transport,
        ClientError::RemoteValidation { .. } => RecordErrorKind::Validation,
        ClientError::DuplicateDetected { .. } => RecordErrorKind::DuplicateDetected,
        _ => RecordErrorKind::Unexpected,
    }
}

#[cfg(test)]
mod tests {
    use crmsync_model::{RecordId, TargetField};

    use super::*;

    #[test]
    fn best_match_prefers_lowest_priority() {
        let duplicates = vec![
            DuplicateMatch::new(2, RecordId::new("00Qa"), [TargetField::Phone], 4),
            DuplicateMatch::new(2, RecordId::new("00Qb"), [TargetField::Email], 1),
            DuplicateMatch::new(3, RecordId::new("00Qc"), [TargetField::Email], 1),
        ];
        let best = best_match(&duplicates, 2).expect("match for record 2");
        assert_eq!(best.existing_record_id, RecordId::new("00Qb"));
        assert!(best_match(&duplicates, 9).is_none());
    }
}
