//! Ordered, multi-combination duplicate search.
//!
//! Instead of a single opaque similarity score, each object type carries
//! an ordered list of field combinations, most specific first. A hit is
//! tagged with the 1-based position of the combination that produced it
//! (its match priority), giving auditable evidence of exactly which
//! fields coincided. The priority is assigned once and never changes.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use crmsync_client::{ClientError, CrmApi, Filter};
use crmsync_model::{CandidateRecord, DuplicateMatch, ObjectType, TargetField};
use crmsync_transform::adapter::destination_name;

/// The ordered search combinations for an object type.
///
/// Declaration order is the evidence ranking; tests pin it.
#[must_use]
pub fn search_combinations(object: ObjectType) -> &'static [&'static [TargetField]] {
    match object {
        ObjectType::Lead | ObjectType::Contact => &[
            &[TargetField::Email],
            &[TargetField::LastName, TargetField::Company],
            &[TargetField::LastName, TargetField::Phone],
            &[TargetField::Phone],
            &[TargetField::LastName, TargetField::Email],
            &[TargetField::Company, TargetField::Phone],
        ],
        ObjectType::Account => &[
            &[TargetField::Company],
            &[TargetField::Company, TargetField::Phone],
            &[TargetField::Phone],
        ],
    }
}

/// Stateless duplicate searcher over a remote query capability.
pub struct DuplicateResolver {
    crm: Arc<dyn CrmApi>,
    concurrency: usize,
}

impl DuplicateResolver {
    pub fn new(crm: Arc<dyn CrmApi>, concurrency: usize) -> Self {
        Self {
            crm,
            concurrency: concurrency.max(1),
        }
    }

    /// Search one candidate against every applicable combination.
    ///
    /// Combinations with any empty field in the record are skipped. Hits
    /// are deduplicated by remote id, keeping the lowest match priority,
    /// and returned sorted ascending by priority.
    pub async fn search(
        &self,
        record_number: usize,
        record: &CandidateRecord,
        object: ObjectType,
    ) -> Result<Vec<DuplicateMatch>, ClientError> {
        let mut by_id: BTreeMap<crmsync_model::RecordId, DuplicateMatch> = BTreeMap::new();

        for (index, combination) in search_combinations(object).iter().enumerate() {
            let priority = index + 1;
            let Some(filter) = build_filter(record, combination, object) else {
                continue;
            };

            let hits = self.crm.query(object, &filter).await?;
            if !hits.is_empty() {
                debug!(
                    record = record_number,
                    priority,
                    hits = hits.len(),
                    "duplicate combination matched"
                );
            }
            for hit in hits {
                // Ascending iteration means the first entry for an id
                // already has the lowest priority; later ones are dropped.
                by_id.entry(hit.id.clone()).or_insert_with(|| {
                    DuplicateMatch::new(
                        record_number,
                        hit.id,
                        combination.iter().copied(),
                        priority,
                    )
                });
            }
        }

        let mut matches: Vec<DuplicateMatch> = by_id.into_values().collect();
        matches.sort_by_key(|m| m.match_priority);
        Ok(matches)
    }

    /// Search every candidate before any write.
    ///
    /// Searches for different records run concurrently, bounded by the
    /// configured limit. Returns all matches sorted by record number then
    /// priority; any entry means the whole batch must be withheld.
    pub async fn proactive_check(
        &self,
        records: &[CandidateRecord],
        object: ObjectType,
    ) -> Result<Vec<DuplicateMatch>, ClientError> {
        // Collected up front: a lazily-mapped iterator here trips rustc's
        // higher-ranked lifetime inference once the caller moves into a
        // spawned task.
        let searches: Vec<_> = records
            .iter()
            .enumerate()
            .map(|(i, record)| self.search(i + 1, record, object))
            .collect();
        let per_record: Vec<Vec<DuplicateMatch>> = stream::iter(searches)
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;

        let mut matches: Vec<DuplicateMatch> = per_record.into_iter().flatten().collect();
        matches.sort_by_key(|m| (m.record_number, m.match_priority));
        Ok(matches)
    }
}

/// Build the exact-match filter for one combination, or `None` when any
/// field is empty in the record or has no destination name on the object.
fn build_filter(
    record: &CandidateRecord,
    combination: &[TargetField],
    object: ObjectType,
) -> Option<Filter> {
    let mut filter = Filter::new();
    for field in combination {
        let value = record.non_empty(*field)?;
        let dest = destination_name(object, *field)?;
        filter = filter.eq(dest, value);
    }
    Some(filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_the_strongest_lead_combination() {
        let combos = search_combinations(ObjectType::Lead);
        assert_eq!(combos[0], &[TargetField::Email]);
        assert_eq!(combos.len(), 6);
    }

    #[test]
    fn combination_order_is_pinned() {
        let combos = search_combinations(ObjectType::Lead);
        assert_eq!(combos[1], &[TargetField::LastName, TargetField::Company]);
        assert_eq!(combos[2], &[TargetField::LastName, TargetField::Phone]);
        assert_eq!(combos[3], &[TargetField::Phone]);
        assert_eq!(combos[4], &[TargetField::LastName, TargetField::Email]);
        assert_eq!(combos[5], &[TargetField::Company, TargetField::Phone]);
    }

    #[test]
    fn filter_skips_combinations_with_empty_fields() {
        let mut record = CandidateRecord::new();
        record.set(TargetField::LastName, "Silva");
        // No Company value: the LastName+Company combination is unusable.
        assert!(build_filter(
            &record,
            &[TargetField::LastName, TargetField::Company],
            ObjectType::Lead
        )
        .is_none());

        record.set(TargetField::Company, "Acme");
        let filter = build_filter(
            &record,
            &[TargetField::LastName, TargetField::Company],
            ObjectType::Lead,
        )
        .expect("filter");
        assert_eq!(
            filter.to_expression(),
            "LastName = 'Silva' AND Company = 'Acme'"
        );
    }
}
