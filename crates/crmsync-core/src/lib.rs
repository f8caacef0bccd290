//! Upload orchestration.
//!
//! Wires the mapping, normalization, and adaptation layers to the remote
//! CRM: proactive duplicate detection, batched partial-failure writes, a
//! phase-ordered job state machine, and the interactive resolution
//! workflow for detected duplicates.

pub mod config;
pub mod job;
pub mod orchestrator;
pub mod resolution;
pub mod resolver;

pub use config::UploadConfig;
pub use job::{JobId, JobPhase, JobStore, MemoryJobStore, UploadJob};
pub use orchestrator::UploadOrchestrator;
pub use resolution::{ResolutionOutcome, ResolutionWorkflow};
pub use resolver::{search_combinations, DuplicateResolver};
