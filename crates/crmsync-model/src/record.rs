//! Candidate records and remote record identifiers.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::field::TargetField;

/// Identifier of a record that already exists on the remote side.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RecordId(String);

impl RecordId {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A normalized row keyed by target field, ready for schema adaptation.
///
/// One per source row; lives only for the duration of a run. Iteration
/// order is the field declaration order via `BTreeMap`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    fields: BTreeMap<TargetField, String>,
}

impl CandidateRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field value, replacing any previous value.
    pub fn set(&mut self, field: TargetField, value: impl Into<String>) {
        self.fields.insert(field, value.into());
    }

    /// The raw value for a field, if present.
    #[must_use]
    pub fn get(&self, field: TargetField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    /// The value for a field when present and non-blank.
    ///
    /// Duplicate-search combinations skip fields this returns `None` for.
    #[must_use]
    pub fn non_empty(&self, field: TargetField) -> Option<&str> {
        self.get(field).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Iterate over all (field, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (TargetField, &str)> {
        self.fields.iter().map(|(f, v)| (*f, v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(TargetField, String)> for CandidateRecord {
    fn from_iter<I: IntoIterator<Item = (TargetField, String)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_filters_blank_values() {
        let mut record = CandidateRecord::new();
        record.set(TargetField::Email, "ana@example.com");
        record.set(TargetField::Phone, "   ");

        assert_eq!(record.non_empty(TargetField::Email), Some("ana@example.com"));
        assert_eq!(record.non_empty(TargetField::Phone), None);
        assert_eq!(record.non_empty(TargetField::Company), None);
    }

    #[test]
    fn set_replaces_value() {
        let mut record = CandidateRecord::new();
        record.set(TargetField::City, "Campinas");
        record.set(TargetField::City, "São Paulo");
        assert_eq!(record.get(TargetField::City), Some("São Paulo"));
        assert_eq!(record.len(), 1);
    }
}
