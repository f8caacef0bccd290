//! Data model for the lead import engine.
//!
//! Shared types crossing crate boundaries: the fixed target-field
//! vocabulary, candidate records, field mappings, duplicate matches,
//! upload results, and resolution decisions.

pub mod duplicate;
pub mod field;
pub mod mapping;
pub mod record;
pub mod upload;

pub use duplicate::DuplicateMatch;
pub use field::{FieldKind, ObjectType, TargetField};
pub use mapping::{ColumnSample, FieldMapping, MAX_SAMPLE_VALUES};
pub use record::{CandidateRecord, RecordId};
pub use upload::{
    RecordError, RecordErrorKind, ResolutionDecision, UploadBatchResult,
};
