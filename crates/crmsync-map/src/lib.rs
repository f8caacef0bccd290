//! Column classification and confidence-scored mapping.
//!
//! Two layers:
//!
//! 1. [`RuleClassifier`] — a pure, ordered rule engine mapping a column
//!    heading to a target field with a 0–100 confidence score.
//! 2. [`Mapper`] — wraps the classifier with a content-addressed cache and
//!    an optional remote classification service consulted only when rule
//!    confidence is insufficient. The remote call is a soft dependency:
//!    any failure falls back to the rule result.

pub mod cache;
pub mod classifier;
pub mod error;
pub mod mapper;
pub mod remote;
pub mod rules;

pub use cache::{FileCache, MappingCache, MemoryCache};
pub use classifier::RuleClassifier;
pub use error::{CacheError, ClassifierError};
pub use mapper::{Mapper, MappingOutcome, MappingSource};
pub use remote::{ClassifierService, NoopClassifier};
