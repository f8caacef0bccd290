//! Duplicate-match evidence produced by the resolver.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::field::TargetField;
use crate::record::RecordId;

/// Evidence that a candidate record coincides with an existing remote one.
///
/// `match_priority` is the 1-based rank of the field combination that
/// produced the hit; lower means stronger evidence. It is assigned when the
/// match is created and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateMatch {
    /// 1-based position of the candidate within the submitted batch.
    pub record_number: usize,
    /// Id of the existing remote record.
    pub existing_record_id: RecordId,
    /// The fields whose values coincided exactly. Empty when the match
    /// came from the remote's own duplicate rules, whose criteria are
    /// not visible here.
    pub matched_fields: BTreeSet<TargetField>,
    /// 1-based rank of the combination that matched (lower = stronger).
    ///
    /// A value above the number of search combinations for the object
    /// marks write-time evidence from the remote's own rules; it ranks
    /// below every local combination and does not index into them.
    pub match_priority: usize,
}

impl DuplicateMatch {
    #[must_use]
    pub fn new(
        record_number: usize,
        existing_record_id: RecordId,
        matched_fields: impl IntoIterator<Item = TargetField>,
        match_priority: usize,
    ) -> Self {
        Self {
            record_number,
            existing_record_id,
            matched_fields: matched_fields.into_iter().collect(),
            match_priority,
        }
    }
}
