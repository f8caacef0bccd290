//! Value normalization and target-schema adaptation.
//!
//! [`normalize`] holds the pure per-field transforms applied between
//! mapping and upload; [`adapter`] renames generic target fields to the
//! destination object's concrete identifiers and enforces its
//! required-field list.

pub mod adapter;
pub mod normalize;

pub use adapter::{AdaptedRecord, AdapterError, SchemaAdapter};
pub use normalize::{
    clean_email, clean_phone, convert_money, normalize_record, normalize_value,
    split_joined_values, title_case_name, NormalizeOptions, DEFAULT_CONNECTORS,
};
