//! The batch upload orchestrator.
//!
//! Phases one job through mapping, the whole-batch proactive duplicate
//! check, and batched composite writes. Phase ordering is strict: the
//! write path is unreachable until the proactive check has completed for
//! every record, and any proactive match withholds the entire batch.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crmsync_client::{
    extract_duplicate_ids, CrmApi, ItemError, DUPLICATE_ERROR_CODE,
};
use crmsync_map::Mapper;
use crmsync_model::{
    CandidateRecord, ColumnSample, DuplicateMatch, ObjectType, RecordError, RecordErrorKind,
    TargetField, UploadBatchResult, MAX_SAMPLE_VALUES,
};
use crmsync_transform::adapter::destination_name;
use crmsync_transform::{normalize_value, AdaptedRecord, NormalizeOptions, SchemaAdapter};

use crate::config::UploadConfig;
use crate::job::{JobPhase, JobStore, UploadJob};
use crate::resolver::{search_combinations, DuplicateResolver};

/// A source row: column heading → raw value.
pub type SourceRow = BTreeMap<String, String>;

/// Records prepared for upload, index-aligned with the source rows.
pub(crate) struct PreparedRecords {
    pub candidates: Vec<CandidateRecord>,
    pub adapted: Vec<AdaptedRecord>,
}

/// Drives upload jobs through their phases.
pub struct UploadOrchestrator {
    crm: Arc<dyn CrmApi>,
    mapper: Arc<Mapper>,
    adapter: SchemaAdapter,
    resolver: DuplicateResolver,
    store: Arc<dyn JobStore>,
    config: UploadConfig,
    normalize: NormalizeOptions,
}

impl UploadOrchestrator {
    pub fn new(
        crm: Arc<dyn CrmApi>,
        mapper: Arc<Mapper>,
        store: Arc<dyn JobStore>,
        config: UploadConfig,
        normalize: NormalizeOptions,
    ) -> Self {
        let resolver =
            DuplicateResolver::new(crm.clone(), config.effective_search_concurrency());
        Self {
            crm,
            mapper,
            adapter: SchemaAdapter::new(),
            resolver,
            store,
            config,
            normalize,
        }
    }

    /// The injected job store, for callers polling job state.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    pub(crate) fn crm(&self) -> &Arc<dyn CrmApi> {
        &self.crm
    }

    /// Run one upload job to a terminal phase and return it.
    pub async fn run(
        &self,
        rows: &[SourceRow],
        object: ObjectType,
        cancel: &CancellationToken,
    ) -> UploadJob {
        let job = UploadJob::new(object);
        self.store.put(job.clone()).await;
        self.execute(job, rows, cancel).await
    }

    /// Run an upload job as cancellable background work.
    ///
    /// Returns immediately with the job id, the token that cancels it,
    /// and the handle resolving to the terminal job state.
    pub async fn spawn(
        self: &Arc<Self>,
        rows: Vec<SourceRow>,
        object: ObjectType,
    ) -> (crate::job::JobId, CancellationToken, JoinHandle<UploadJob>) {
        let job = UploadJob::new(object);
        let id = job.id;
        self.store.put(job.clone()).await;

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move { this.execute(job, &rows, &cancel).await });
        (id, token, handle)
    }

    async fn execute(
        &self,
        mut job: UploadJob,
        rows: &[SourceRow],
        cancel: &CancellationToken,
    ) -> UploadJob {
        let object = job.object;

        job.advance(JobPhase::Mapping);
        self.store.put(job.clone()).await;

        let prepared = match self.prepare_records(rows, object).await {
            Ok(prepared) => prepared,
            Err((row, message)) => {
                // Configuration-class failure: the batch never reaches the
                // write path and there is no partial summary to report.
                warn!(job = %job.id, row, %message, "mapping phase failed");
                job.error = Some(format!("record {row}: {message}"));
                job.advance(JobPhase::Failed);
                self.store.put(job.clone()).await;
                return job;
            }
        };

        if cancel.is_cancelled() {
            info!(job = %job.id, "cancelled before duplicate check, nothing written");
            job.advance(JobPhase::Cancelled);
            self.store.put(job.clone()).await;
            return job;
        }

        job.advance(JobPhase::ProactiveDuplicateCheck);
        self.store.put(job.clone()).await;

        let matches = match self
            .resolver
            .proactive_check(&prepared.candidates, object)
            .await
        {
            Ok(matches) => matches,
            Err(e) => {
                // Without a completed check there is no safe way to write.
                warn!(job = %job.id, error = %e, "proactive duplicate check failed");
                job.error = Some(format!("duplicate check failed: {e}"));
                job.advance(JobPhase::Failed);
                self.store.put(job.clone()).await;
                return job;
            }
        };

        if !matches.is_empty() {
            info!(
                job = %job.id,
                matches = matches.len(),
                "duplicates detected, batch withheld for resolution"
            );
            job.duplicates = matches;
            job.advance(JobPhase::DuplicatesPendingResolution);
            self.store.put(job.clone()).await;
            return job;
        }

        if cancel.is_cancelled() {
            info!(job = %job.id, "cancelled before upload, nothing written");
            job.advance(JobPhase::Cancelled);
            self.store.put(job.clone()).await;
            return job;
        }

        job.advance(JobPhase::Uploading);
        self.store.put(job.clone()).await;

        let result = self
            .upload_batches(&prepared.candidates, &prepared.adapted, object, cancel)
            .await;

        info!(
            job = %job.id,
            processed = result.processed,
            successful = result.successful,
            failed = result.failed,
            "upload finished"
        );

        let phase = if result.successful > 0 {
            JobPhase::Completed
        } else {
            JobPhase::Failed
        };
        job.result = Some(result);
        job.advance(phase);
        self.store.put(job.clone()).await;
        job
    }

    /// Map, normalize, and adapt every source row.
    ///
    /// Fails on the first record missing required fields; the error names
    /// the 1-based row and every gap.
    pub(crate) async fn prepare_records(
        &self,
        rows: &[SourceRow],
        object: ObjectType,
    ) -> Result<PreparedRecords, (usize, String)> {
        let samples = collect_samples(rows);
        let outcome = self.mapper.map(&samples).await;
        debug!(
            columns = samples.len(),
            source = ?outcome.source,
            cache_hit = outcome.cache_hit,
            "column mapping resolved"
        );

        let mut candidates = Vec::with_capacity(rows.len());
        let mut adapted = Vec::with_capacity(rows.len());

        for (index, row) in rows.iter().enumerate() {
            let mut candidate = CandidateRecord::new();
            for mapping in &outcome.mappings {
                if mapping.target_field == TargetField::Unmapped {
                    continue;
                }
                let Some(raw) = row.get(&mapping.source_field) else {
                    continue;
                };
                if raw.trim().is_empty() {
                    continue;
                }
                let value = normalize_value(mapping.target_field, raw, &self.normalize);
                candidate.set(mapping.target_field, value);
            }

            let row_number = index + 1;
            match self.adapter.adapt(&candidate, object) {
                Ok(record) => {
                    candidates.push(candidate);
                    adapted.push(record);
                }
                Err(e) => return Err((row_number, e.to_string())),
            }
        }

        Ok(PreparedRecords {
            candidates,
            adapted,
        })
    }

    /// Write prepared records in composite batches.
    ///
    /// Outcomes are independent per record. Cancellation between batches
    /// stops further writes; an in-flight batch always finishes.
    pub(crate) async fn upload_batches(
        &self,
        candidates: &[CandidateRecord],
        adapted: &[AdaptedRecord],
        object: ObjectType,
        cancel: &CancellationToken,
    ) -> UploadBatchResult {
        let mut merged = UploadBatchResult::new();
        let batch_size = self.config.effective_batch_size();

        for chunk_start in (0..adapted.len()).step_by(batch_size) {
            if cancel.is_cancelled() {
                warn!(
                    written = merged.processed,
                    remaining = adapted.len() - chunk_start,
                    "upload cancelled, remaining batches skipped"
                );
                break;
            }

            let end = (chunk_start + batch_size).min(adapted.len());
            let fields: Vec<BTreeMap<String, String>> = adapted[chunk_start..end]
                .iter()
                .map(|record| record.fields.clone())
                .collect();

            match self.crm.create_composite(object, &fields).await {
                Ok(items) => {
                    for (offset, item) in items.into_iter().enumerate() {
                        let row = chunk_start + offset + 1;
                        match item {
                            Ok(id) => {
                                debug!(row, id = %id, "record created");
                                merged.record_success();
                            }
                            Err(item_error) => {
                                self.classify_failure(
                                    &mut merged,
                                    row,
                                    &candidates[row - 1],
                                    item_error,
                                    object,
                                )
                                .await;
                            }
                        }
                    }
                }
                Err(e) => {
                    // Whole-call failure: every record of this batch needs
                    // resubmission. No automatic retry.
                    warn!(error = %e, batch_start = chunk_start + 1, "composite call failed");
                    for offset in 0..fields.len() {
                        merged.record_failure(RecordError {
                            row: chunk_start + offset + 1,
                            fields: Vec::new(),
                            kind: RecordErrorKind::Transport,
                            code: None,
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        merged
    }

    /// Classify one per-record write failure and collect duplicate
    /// evidence for it.
    async fn classify_failure(
        &self,
        merged: &mut UploadBatchResult,
        row: usize,
        candidate: &CandidateRecord,
        item_error: ItemError,
        object: ObjectType,
    ) {
        let kind = if item_error.code == DUPLICATE_ERROR_CODE {
            RecordErrorKind::DuplicateDetected
        } else if item_error.code == "UNKNOWN" {
            RecordErrorKind::Unexpected
        } else {
            RecordErrorKind::Validation
        };

        if kind == RecordErrorKind::DuplicateDetected {
            let ids = extract_duplicate_ids(&item_error.message, object);
            if ids.is_empty() {
                // The remote did not name the existing records; fall back
                // to our own search for auditable evidence.
                match self.resolver.search(row, candidate, object).await {
                    Ok(matches) => {
                        for matched in matches {
                            merged.record_duplicate(matched);
                        }
                    }
                    Err(e) => {
                        warn!(row, error = %e, "supplemental duplicate search failed");
                    }
                }
            } else {
                // The remote's own rules matched, but on fields we cannot
                // see; rank such evidence below every search combination.
                let write_time_priority = search_combinations(object).len() + 1;
                for id in ids {
                    merged.record_duplicate(DuplicateMatch::new(
                        row,
                        id,
                        std::iter::empty(),
                        write_time_priority,
                    ));
                }
            }
        }

        merged.record_failure(RecordError {
            row,
            fields: fields_from_destination(object, &item_error.fields),
            kind,
            code: Some(item_error.code),
            message: item_error.message,
        });
    }
}

/// Build one `ColumnSample` per distinct column across all rows.
fn collect_samples(rows: &[SourceRow]) -> Vec<ColumnSample> {
    let mut names: BTreeSet<&str> = BTreeSet::new();
    for row in rows {
        names.extend(row.keys().map(String::as_str));
    }

    names
        .into_iter()
        .map(|name| {
            let values: Vec<String> = rows
                .iter()
                .filter_map(|row| row.get(name))
                .filter(|v| !v.trim().is_empty())
                .take(MAX_SAMPLE_VALUES)
                .cloned()
                .collect();
            ColumnSample::new(name, values)
        })
        .collect()
}

/// Map destination field names the remote blamed back onto the generic
/// vocabulary. Names with no generic counterpart are dropped.
fn fields_from_destination(object: ObjectType, names: &[String]) -> Vec<TargetField> {
    names
        .iter()
        .filter_map(|name| {
            TargetField::ALL
                .iter()
                .copied()
                .find(|field| destination_name(object, *field) == Some(name.as_str()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_bound_values_per_column() {
        let rows: Vec<SourceRow> = (0..10)
            .map(|i| {
                let mut row = BTreeMap::new();
                row.insert("email".to_string(), format!("user{i}@example.com"));
                row
            })
            .collect();

        let samples = collect_samples(&rows);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].values.len(), MAX_SAMPLE_VALUES);
    }

    #[test]
    fn samples_skip_blank_values() {
        let mut row_a = BTreeMap::new();
        row_a.insert("nome".to_string(), "  ".to_string());
        let mut row_b = BTreeMap::new();
        row_b.insert("nome".to_string(), "Ana".to_string());

        let samples = collect_samples(&[row_a, row_b]);
        assert_eq!(samples[0].values, vec!["Ana".to_string()]);
    }

    #[test]
    fn destination_names_map_back_to_vocabulary() {
        let fields = fields_from_destination(
            ObjectType::Contact,
            &["MailingCity".to_string(), "Nonexistent".to_string()],
        );
        assert_eq!(fields, vec![TargetField::City]);
    }
}
