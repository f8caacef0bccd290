//! Upload job state and the injected job store.
//!
//! Jobs move strictly forward through their phases; no write is attempted
//! until the proactive duplicate check has finished for the whole batch.
//! The store is a plain get/put/delete seam so orchestration is testable
//! without ambient global state.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crmsync_model::{DuplicateMatch, ObjectType, UploadBatchResult};

/// Opaque job identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct JobId(Uuid);

impl JobId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Phases of an upload job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobPhase {
    Queued,
    /// Classifier, mapper, normalizer, and adapter run over all records.
    Mapping,
    /// Whole-batch duplicate search before any write.
    ProactiveDuplicateCheck,
    /// Matches found; nothing written, caller must resolve.
    DuplicatesPendingResolution,
    /// Batched composite writes in flight.
    Uploading,
    /// At least one record was written.
    Completed,
    /// Nothing was written, or a configuration error aborted the job.
    Failed,
    /// Cancelled by the caller before completion.
    Cancelled,
}

impl JobPhase {
    /// Whether the job can still make progress.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::DuplicatesPendingResolution | Self::Completed | Self::Failed | Self::Cancelled
        )
    }
}

/// One upload job's observable state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadJob {
    pub id: JobId,
    pub object: ObjectType,
    pub phase: JobPhase,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Merged write outcome, present once uploading has run.
    pub result: Option<UploadBatchResult>,
    /// Proactively detected duplicates awaiting resolution.
    pub duplicates: Vec<DuplicateMatch>,
    /// Job-level failure description, for configuration-class aborts.
    pub error: Option<String>,
}

impl UploadJob {
    #[must_use]
    pub fn new(object: ObjectType) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            object,
            phase: JobPhase::Queued,
            created_at: now,
            updated_at: now,
            result: None,
            duplicates: Vec::new(),
            error: None,
        }
    }

    /// Advance to `phase` and refresh the update timestamp.
    pub fn advance(&mut self, phase: JobPhase) {
        self.phase = phase;
        self.updated_at = Utc::now();
    }
}

/// Injected persistence seam for job state.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn get(&self, id: JobId) -> Option<UploadJob>;
    async fn put(&self, job: UploadJob);
    async fn delete(&self, id: JobId);
}

/// In-memory job store; the default for tests and single-process use.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<JobId, UploadJob>>,
}

impl MemoryJobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn get(&self, id: JobId) -> Option<UploadJob> {
        self.jobs.read().await.get(&id).cloned()
    }

    async fn put(&self, job: UploadJob) {
        self.jobs.write().await.insert(job.id, job);
    }

    async fn delete(&self, id: JobId) {
        self.jobs.write().await.remove(&id);
    }
}
