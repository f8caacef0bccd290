//! Remote service clients.
//!
//! [`CrmApi`] is the seam the core orchestration talks through; the
//! reqwest-backed [`RestCrmClient`] implements it against the CRM's REST
//! surface. [`HttpClassifier`] implements the mapping crate's
//! [`crmsync_map::ClassifierService`] seam against the optional learned
//! classification service. OAuth token exchange is out of scope: clients
//! receive a ready bearer token at construction.

pub mod api;
pub mod duplicate_ids;
pub mod error;
pub mod rest;

pub use api::{
    CrmApi, Filter, ItemError, ItemResult, RemoteRecord, COMPOSITE_BATCH_LIMIT,
    DUPLICATE_ERROR_CODE,
};
pub use duplicate_ids::extract_duplicate_ids;
pub use error::{ClientError, Result};
pub use rest::{HttpClassifier, RestCrmClient};
