//! The fixed target-field vocabulary and remote object types.
//!
//! Every mapping target is drawn from [`TargetField`]; columns no rule or
//! classifier can place land on the [`TargetField::Unmapped`] sentinel.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A field in the destination schema.
///
/// The vocabulary is closed: the classifier, the remote classification
/// service, and the schema adapter all speak in these names.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum TargetField {
    Email,
    FirstName,
    LastName,
    Company,
    Phone,
    MobilePhone,
    Title,
    Website,
    Street,
    City,
    State,
    PostalCode,
    Country,
    Industry,
    AnnualRevenue,
    NumberOfEmployees,
    LeadSource,
    Description,
    /// Sentinel for columns no rule or classifier could place.
    Unmapped,
}

impl TargetField {
    /// Every mappable field, excluding the `Unmapped` sentinel.
    ///
    /// This is the vocabulary sent to the remote classification service.
    pub const ALL: &'static [TargetField] = &[
        Self::Email,
        Self::FirstName,
        Self::LastName,
        Self::Company,
        Self::Phone,
        Self::MobilePhone,
        Self::Title,
        Self::Website,
        Self::Street,
        Self::City,
        Self::State,
        Self::PostalCode,
        Self::Country,
        Self::Industry,
        Self::AnnualRevenue,
        Self::NumberOfEmployees,
        Self::LeadSource,
        Self::Description,
    ];

    /// Canonical field name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "Email",
            Self::FirstName => "FirstName",
            Self::LastName => "LastName",
            Self::Company => "Company",
            Self::Phone => "Phone",
            Self::MobilePhone => "MobilePhone",
            Self::Title => "Title",
            Self::Website => "Website",
            Self::Street => "Street",
            Self::City => "City",
            Self::State => "State",
            Self::PostalCode => "PostalCode",
            Self::Country => "Country",
            Self::Industry => "Industry",
            Self::AnnualRevenue => "AnnualRevenue",
            Self::NumberOfEmployees => "NumberOfEmployees",
            Self::LeadSource => "LeadSource",
            Self::Description => "Description",
            Self::Unmapped => "UNMAPPED",
        }
    }

    /// Parse a canonical field name (case-insensitive).
    ///
    /// Returns `None` for anything outside the vocabulary, including the
    /// sentinel spelled differently than `UNMAPPED`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let trimmed = name.trim();
        if trimmed.eq_ignore_ascii_case("UNMAPPED") {
            return Some(Self::Unmapped);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str().eq_ignore_ascii_case(trimmed))
    }

    /// The semantic kind driving value normalization for this field.
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Email => FieldKind::Email,
            Self::FirstName | Self::LastName => FieldKind::PersonName,
            Self::Phone | Self::MobilePhone => FieldKind::Phone,
            Self::AnnualRevenue => FieldKind::Money,
            Self::Description => FieldKind::MultiValue,
            _ => FieldKind::Plain,
        }
    }
}

impl fmt::Display for TargetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic category of a target field's values.
///
/// Drives which normalization transform applies to the raw source value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Telephone number: digits and a leading plus only.
    Phone,
    /// Human name: title case with connector words kept lowercase.
    PersonName,
    /// Email address: trimmed and lowercased.
    Email,
    /// Monetary amount: parsed to a plain numeral.
    Money,
    /// Free text that may carry run-together values needing separation.
    MultiValue,
    /// Passed through after trimming.
    Plain,
}

/// Remote object types records can be imported as.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ObjectType {
    Lead,
    Contact,
    Account,
}

impl ObjectType {
    /// API name of the object on the remote side.
    #[must_use]
    pub fn api_name(&self) -> &'static str {
        match self {
            Self::Lead => "Lead",
            Self::Contact => "Contact",
            Self::Account => "Account",
        }
    }

    /// Three-character prefix carried by every remote record id of this
    /// object type. Used to extract existing-record ids from duplicate
    /// error messages.
    #[must_use]
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Self::Lead => "00Q",
            Self::Contact => "003",
            Self::Account => "001",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_roundtrips_vocabulary() {
        for field in TargetField::ALL {
            assert_eq!(TargetField::parse(field.as_str()), Some(*field));
        }
        assert_eq!(TargetField::parse("unmapped"), Some(TargetField::Unmapped));
        assert_eq!(TargetField::parse("NotAField"), None);
    }

    #[test]
    fn sentinel_excluded_from_vocabulary() {
        assert!(!TargetField::ALL.contains(&TargetField::Unmapped));
    }

    #[test]
    fn field_kinds() {
        assert_eq!(TargetField::Phone.kind(), FieldKind::Phone);
        assert_eq!(TargetField::FirstName.kind(), FieldKind::PersonName);
        assert_eq!(TargetField::AnnualRevenue.kind(), FieldKind::Money);
        assert_eq!(TargetField::Description.kind(), FieldKind::MultiValue);
        assert_eq!(TargetField::City.kind(), FieldKind::Plain);
    }

    #[test]
    fn object_id_prefixes() {
        assert_eq!(ObjectType::Lead.id_prefix(), "00Q");
        assert_eq!(ObjectType::Contact.id_prefix(), "003");
        assert_eq!(ObjectType::Account.id_prefix(), "001");
    }
}
