//! Target schema adaptation.
//!
//! Generic target fields are renamed to the destination object's concrete
//! API identifiers; fields with no destination counterpart are carried
//! under their generic name and reported, never silently dropped. After
//! renaming, the object's required-field list is enforced: a gap makes the
//! whole batch ineligible for writing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crmsync_model::{CandidateRecord, ObjectType, TargetField};

/// Adaptation failures. Configuration-class: these abort the batch before
/// any write.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AdapterError {
    /// One or more required destination fields are absent or blank.
    #[error("{object} record is missing required field(s): {}", .missing.join(", "))]
    MissingRequired {
        object: ObjectType,
        /// Destination API names of the gaps.
        missing: Vec<String>,
    },
}

/// A record expressed in the destination object's own field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdaptedRecord {
    pub object: ObjectType,
    /// Destination API field name → value.
    pub fields: BTreeMap<String, String>,
    /// Generic fields that had no destination counterpart. Their values
    /// are still present in `fields` under the generic name.
    pub unmapped: Vec<TargetField>,
}

/// Renames generic fields per object type and validates required fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaAdapter;

impl SchemaAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Adapt a normalized record for the given object type.
    ///
    /// Blank values are dropped before renaming: the remote treats an
    /// explicit empty string as an overwrite, which an import must never
    /// imply.
    pub fn adapt(
        &self,
        record: &CandidateRecord,
        object: ObjectType,
    ) -> Result<AdaptedRecord, AdapterError> {
        let mut fields = BTreeMap::new();
        let mut unmapped = Vec::new();

        for (field, value) in record.iter() {
            if field == TargetField::Unmapped || value.trim().is_empty() {
                continue;
            }
            match destination_name(object, field) {
                Some(dest) => {
                    fields.insert(dest.to_string(), value.to_string());
                }
                None => {
                    fields.insert(field.as_str().to_string(), value.to_string());
                    unmapped.push(field);
                }
            }
        }

        let missing: Vec<String> = required_fields(object)
            .iter()
            .filter(|dest| {
                fields
                    .get(**dest)
                    .map(String::as_str)
                    .unwrap_or("")
                    .trim()
                    .is_empty()
            })
            .map(|dest| (*dest).to_string())
            .collect();

        if !missing.is_empty() {
            return Err(AdapterError::MissingRequired { object, missing });
        }

        Ok(AdaptedRecord {
            object,
            fields,
            unmapped,
        })
    }
}

/// Destination API name for a generic field on an object type.
///
/// `None` means the object has no counterpart; the field is carried under
/// its generic name and reported as unmapped.
#[must_use]
pub fn destination_name(object: ObjectType, field: TargetField) -> Option<&'static str> {
    match object {
        ObjectType::Lead => match field {
            TargetField::Unmapped => None,
            _ => Some(field.as_str()),
        },
        ObjectType::Contact => match field {
            TargetField::FirstName => Some("FirstName"),
            TargetField::LastName => Some("LastName"),
            TargetField::Email => Some("Email"),
            TargetField::Phone => Some("Phone"),
            TargetField::MobilePhone => Some("MobilePhone"),
            TargetField::Title => Some("Title"),
            TargetField::LeadSource => Some("LeadSource"),
            TargetField::Description => Some("Description"),
            TargetField::Street => Some("MailingStreet"),
            TargetField::City => Some("MailingCity"),
            TargetField::State => Some("MailingState"),
            TargetField::PostalCode => Some("MailingPostalCode"),
            TargetField::Country => Some("MailingCountry"),
            _ => None,
        },
        ObjectType::Account => match field {
            TargetField::Company => Some("Name"),
            TargetField::Phone => Some("Phone"),
            TargetField::Website => Some("Website"),
            TargetField::Industry => Some("Industry"),
            TargetField::AnnualRevenue => Some("AnnualRevenue"),
            TargetField::NumberOfEmployees => Some("NumberOfEmployees"),
            TargetField::Description => Some("Description"),
            TargetField::Street => Some("BillingStreet"),
            TargetField::City => Some("BillingCity"),
            TargetField::State => Some("BillingState"),
            TargetField::PostalCode => Some("BillingPostalCode"),
            TargetField::Country => Some("BillingCountry"),
            _ => None,
        },
    }
}

/// Destination-name required list per object type, checked post-rename.
#[must_use]
pub fn required_fields(object: ObjectType) -> &'static [&'static str] {
    match object {
        ObjectType::Lead => &["LastName", "Company"],
        ObjectType::Contact => &["LastName"],
        ObjectType::Account => &["Name"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead_record() -> CandidateRecord {
        let mut record = CandidateRecord::new();
        record.set(TargetField::LastName, "Silva");
        record.set(TargetField::Company, "Acme Ltda");
        record.set(TargetField::Email, "silva@acme.com.br");
        record
    }

    #[test]
    fn lead_fields_keep_their_names() {
        let adapted = SchemaAdapter::new()
            .adapt(&lead_record(), ObjectType::Lead)
            .expect("valid lead");
        assert_eq!(adapted.fields.get("LastName").map(String::as_str), Some("Silva"));
        assert_eq!(adapted.fields.get("Company").map(String::as_str), Some("Acme Ltda"));
        assert!(adapted.unmapped.is_empty());
    }

    #[test]
    fn contact_address_fields_are_renamed() {
        let mut record = CandidateRecord::new();
        record.set(TargetField::LastName, "Souza");
        record.set(TargetField::City, "Campinas");

        let adapted = SchemaAdapter::new()
            .adapt(&record, ObjectType::Contact)
            .expect("valid contact");
        assert_eq!(
            adapted.fields.get("MailingCity").map(String::as_str),
            Some("Campinas")
        );
        assert!(!adapted.fields.contains_key("City"));
    }

    #[test]
    fn unmapped_fields_reported_not_dropped() {
        let mut record = CandidateRecord::new();
        record.set(TargetField::LastName, "Souza");
        record.set(TargetField::Company, "Acme Ltda");

        let adapted = SchemaAdapter::new()
            .adapt(&record, ObjectType::Contact)
            .expect("valid contact");
        // Contact has no Company counterpart: carried under generic name.
        assert_eq!(
            adapted.fields.get("Company").map(String::as_str),
            Some("Acme Ltda")
        );
        assert_eq!(adapted.unmapped, vec![TargetField::Company]);
    }

    #[test]
    fn missing_required_enumerates_all_gaps() {
        let mut record = CandidateRecord::new();
        record.set(TargetField::Email, "x@y.com");

        let err = SchemaAdapter::new()
            .adapt(&record, ObjectType::Lead)
            .expect_err("lead without LastName/Company");
        let AdapterError::MissingRequired { object, missing } = err else {
            panic!("unexpected error variant");
        };
        assert_eq!(object, ObjectType::Lead);
        assert_eq!(missing, vec!["LastName".to_string(), "Company".to_string()]);
    }

    #[test]
    fn blank_required_value_counts_as_missing() {
        let mut record = CandidateRecord::new();
        record.set(TargetField::LastName, "Silva");
        record.set(TargetField::Company, "   ");

        let err = SchemaAdapter::new()
            .adapt(&record, ObjectType::Lead)
            .expect_err("blank company");
        assert!(matches!(err, AdapterError::MissingRequired { .. }));
    }

    #[test]
    fn account_renames_company_to_name() {
        let mut record = CandidateRecord::new();
        record.set(TargetField::Company, "Acme Ltda");

        let adapted = SchemaAdapter::new()
            .adapt(&record, ObjectType::Account)
            .expect("valid account");
        assert_eq!(adapted.fields.get("Name").map(String::as_str), Some("Acme Ltda"));
    }
}
