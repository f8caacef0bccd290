//! Extraction of existing-record ids from duplicate error messages.
//!
//! When the remote's duplicate rules reject a write, the error message may
//! embed the ids of the records it matched. Ids are 15 or 18 alphanumeric
//! characters and start with an object-type-specific three-character
//! prefix. When nothing extracts, the caller degrades to a supplemental
//! duplicate search.

use std::sync::LazyLock;

use regex::Regex;

use crmsync_model::{ObjectType, RecordId};

static ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    // 15-char id with an optional 3-char case-safety suffix.
    Regex::new(r"\b[a-zA-Z0-9]{15}(?:[a-zA-Z0-9]{3})?\b").expect("invalid id pattern")
});

/// Pull every id of the given object type out of an error message.
///
/// Order of first appearance is kept; repeats are dropped.
#[must_use]
pub fn extract_duplicate_ids(message: &str, object: ObjectType) -> Vec<RecordId> {
    let prefix = object.id_prefix();
    let mut seen = Vec::new();
    for found in ID_PATTERN.find_iter(message) {
        let candidate = found.as_str();
        if !candidate.starts_with(prefix) {
            continue;
        }
        let id = RecordId::new(candidate);
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_prefixed_ids_only() {
        let message =
            "duplicate value found: matches 00Q5f000001AbCdEAA and account 0015f000001XyZw";
        let ids = extract_duplicate_ids(message, ObjectType::Lead);
        assert_eq!(ids, vec![RecordId::new("00Q5f000001AbCdEAA")]);
    }

    #[test]
    fn keeps_first_occurrence_order_without_repeats() {
        let message = "ids: 00Q000000000001AAA, 00Q000000000002AAA, 00Q000000000001AAA";
        let ids = extract_duplicate_ids(message, ObjectType::Lead);
        assert_eq!(
            ids,
            vec![
                RecordId::new("00Q000000000001AAA"),
                RecordId::new("00Q000000000002AAA"),
            ]
        );
    }

    #[test]
    fn accepts_15_char_ids() {
        let ids = extract_duplicate_ids("match 003000000000001", ObjectType::Contact);
        assert_eq!(ids, vec![RecordId::new("003000000000001")]);
    }

    #[test]
    fn empty_when_nothing_matches() {
        assert!(extract_duplicate_ids("no ids here", ObjectType::Lead).is_empty());
        // Wrong object prefix.
        assert!(extract_duplicate_ids("match 00Q000000000001AAA", ObjectType::Account).is_empty());
    }
}
