//! The remote CRM capability surface.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crmsync_model::{ObjectType, RecordId};

use crate::error::Result;

/// Most records one composite create call accepts.
pub const COMPOSITE_BATCH_LIMIT: usize = 200;

/// Machine-readable code the remote uses when its own duplicate rules
/// reject a write. The message may embed existing-record ids.
pub const DUPLICATE_ERROR_CODE: &str = "DUPLICATES_DETECTED";

/// An exact-match conjunctive filter: every clause must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    clauses: Vec<(String, String)>,
}

impl Filter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality clause.
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.clauses.push((field.into(), value.into()));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Field names referenced by the filter, in clause order.
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        self.clauses.iter().map(|(f, _)| f.as_str()).collect()
    }

    /// The raw equality clauses, for implementations that match in
    /// memory instead of rendering an expression.
    #[must_use]
    pub fn clauses(&self) -> &[(String, String)] {
        &self.clauses
    }

    /// Render as a query-language boolean expression.
    ///
    /// Single quotes and backslashes in values are escaped; field names
    /// come from the fixed schema tables, never from user input.
    #[must_use]
    pub fn to_expression(&self) -> String {
        self.clauses
            .iter()
            .map(|(field, value)| format!("{field} = '{}'", escape(value)))
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// A record as it exists on the remote side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub id: RecordId,
    /// Destination API field name → value, as returned by the query.
    pub fields: BTreeMap<String, String>,
}

/// Structured per-record failure inside a composite create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemError {
    /// Machine-readable code; [`DUPLICATE_ERROR_CODE`] marks write-time
    /// duplicate rejections.
    pub code: String,
    pub message: String,
    /// Destination field names the remote blamed, if any.
    pub fields: Vec<String>,
}

/// Outcome of one record within a composite create.
pub type ItemResult = std::result::Result<RecordId, ItemError>;

/// The remote CRM API the core depends on.
///
/// All calls are non-blocking and carry bounded timeouts inside the
/// implementation. The remote is authoritative; none of these calls are
/// transactional across records.
#[async_trait]
pub trait CrmApi: Send + Sync {
    /// Exact-match search. Returns matching records with at least their id.
    async fn query(&self, object: ObjectType, filter: &Filter) -> Result<Vec<RemoteRecord>>;

    /// Create one record, returning its new id.
    async fn create(
        &self,
        object: ObjectType,
        fields: &BTreeMap<String, String>,
    ) -> Result<RecordId>;

    /// Create up to [`COMPOSITE_BATCH_LIMIT`] records in one call.
    ///
    /// Outcomes are independent per record: a failed record never rolls
    /// back its batch mates. The returned vector is index-aligned with
    /// the input.
    async fn create_composite(
        &self,
        object: ObjectType,
        records: &[BTreeMap<String, String>],
    ) -> Result<Vec<ItemResult>>;

    /// Overwrite the given fields on an existing record.
    async fn update(
        &self,
        object: ObjectType,
        id: &RecordId,
        fields: &BTreeMap<String, String>,
    ) -> Result<()>;
}
