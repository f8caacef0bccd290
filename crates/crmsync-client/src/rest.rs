//! reqwest-backed implementations of the remote seams.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crmsync_map::{ClassifierError, ClassifierService};
use crmsync_model::{ColumnSample, FieldMapping, ObjectType, RecordId, TargetField};

use crate::api::{CrmApi, Filter, ItemError, ItemResult, RemoteRecord, COMPOSITE_BATCH_LIMIT};
use crate::error::{ClientError, Result};

/// REST API version segment.
const API_VERSION: &str = "v59.0";

/// Timeout for CRM reads and writes.
const CRM_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for the classification service. Shorter: a slow classifier
/// only delays a fallback that is already in hand.
const CLASSIFY_TIMEOUT: Duration = Duration::from_secs(20);

/// CRM client over the remote's REST surface.
///
/// Token exchange and refresh happen elsewhere; this client is handed a
/// ready bearer token.
pub struct RestCrmClient {
    http: Client,
    base_url: String,
    token: String,
}

impl RestCrmClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(CRM_TIMEOUT)
            .build()
            .map_err(ClientError::from)?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/services/data/{API_VERSION}/{path}", self.base_url)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Map a non-success response into the structured error taxonomy.
    async fn decode_failure(response: reqwest::Response) -> ClientError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        if let Ok(envelope) = serde_json::from_str::<Vec<ApiErrorBody>>(&body) {
            if let Some(first) = envelope.into_iter().next() {
                if first.error_code == crate::api::DUPLICATE_ERROR_CODE {
                    return ClientError::DuplicateDetected {
                        message: first.message,
                    };
                }
                return ClientError::RemoteValidation {
                    code: first.error_code,
                    message: first.message,
                };
            }
        }

        ClientError::Api {
            status,
            message: body,
        }
    }
}

#[async_trait]
impl CrmApi for RestCrmClient {
    async fn query(&self, object: ObjectType, filter: &Filter) -> Result<Vec<RemoteRecord>> {
        let mut select: Vec<&str> = vec!["Id"];
        select.extend(filter.fields());
        let soql = format!(
            "SELECT {} FROM {} WHERE {}",
            select.join(", "),
            object.api_name(),
            filter.to_expression()
        );
        debug!(object = %object, soql = %soql, "running duplicate query");

        let response = self
            .http
            .get(self.url("query"))
            .header(AUTHORIZATION, self.bearer())
            .query(&[("q", soql.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::decode_failure(response).await);
        }

        let body: QueryResponse = response.json().await.map_err(ClientError::from)?;
        Ok(body
            .records
            .into_iter()
            .map(QueryRecord::into_remote)
            .collect())
    }

    async fn create(
        &self,
        object: ObjectType,
        fields: &BTreeMap<String, String>,
    ) -> Result<RecordId> {
        let response = self
            .http
            .post(self.url(&format!("sobjects/{}", object.api_name())))
            .header(AUTHORIZATION, self.bearer())
            .json(fields)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::decode_failure(response).await);
        }

        let body: CreateResponse = response.json().await.map_err(ClientError::from)?;
        Ok(RecordId::new(body.id))
    }

    async fn create_composite(
        &self,
        object: ObjectType,
        records: &[BTreeMap<String, String>],
    ) -> Result<Vec<ItemResult>> {
        if records.len() > COMPOSITE_BATCH_LIMIT {
            return Err(ClientError::BatchTooLarge {
                len: records.len(),
                limit: COMPOSITE_BATCH_LIMIT,
            });
        }

        let request = CompositeRequest::build(object, records);
        let response = self
            .http
            .post(self.url(&format!("composite/tree/{}", object.api_name())))
            .header(AUTHORIZATION, self.bearer())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        // The composite endpoint reports per-record failures in a 400 body
        // with the same shape as the success body.
        if !status.is_success() && status != StatusCode::BAD_REQUEST {
            return Err(Self::decode_failure(response).await);
        }

        let body: CompositeResponse = response.json().await.map_err(ClientError::from)?;
        Ok(body.into_item_results(records.len()))
    }

    async fn update(
        &self,
        object: ObjectType,
        id: &RecordId,
        fields: &BTreeMap<String, String>,
    ) -> Result<()> {
        let response = self
            .http
            .patch(self.url(&format!("sobjects/{}/{}", object.api_name(), id)))
            .header(AUTHORIZATION, self.bearer())
            .json(fields)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::decode_failure(response).await);
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "errorCode")]
    error_code: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    records: Vec<QueryRecord>,
}

#[derive(Debug, Deserialize)]
struct QueryRecord {
    #[serde(rename = "Id")]
    id: String,
    #[serde(flatten)]
    fields: BTreeMap<String, serde_json::Value>,
}

impl QueryRecord {
    fn into_remote(self) -> RemoteRecord {
        let fields = self
            .fields
            .into_iter()
            .filter(|(name, _)| name != "attributes")
            .filter_map(|(name, value)| match value {
                serde_json::Value::String(s) => Some((name, s)),
                serde_json::Value::Number(n) => Some((name, n.to_string())),
                serde_json::Value::Bool(b) => Some((name, b.to_string())),
                _ => None,
            })
            .collect();
        RemoteRecord {
            id: RecordId::new(self.id),
            fields,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    id: String,
}

#[derive(Debug, Serialize)]
struct CompositeRequest {
    records: Vec<serde_json::Map<String, serde_json::Value>>,
}

impl CompositeRequest {
    fn build(object: ObjectType, records: &[BTreeMap<String, String>]) -> Self {
        let records = records
            .iter()
            .enumerate()
            .map(|(i, fields)| {
                let mut entry = serde_json::Map::new();
                entry.insert(
                    "attributes".to_string(),
                    serde_json::json!({
                        "type": object.api_name(),
                        "referenceId": format!("ref{i}"),
                    }),
                );
                for (name, value) in fields {
                    entry.insert(name.clone(), serde_json::Value::String(value.clone()));
                }
                entry
            })
            .collect();
        Self { records }
    }
}

#[derive(Debug, Deserialize)]
struct CompositeResponse {
    #[serde(rename = "hasErrors", default)]
    has_errors: bool,
    #[serde(default)]
    results: Vec<CompositeItem>,
}

#[derive(Debug, Deserialize)]
struct CompositeItem {
    #[serde(rename = "referenceId")]
    reference_id: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    errors: Vec<CompositeItemError>,
}

#[derive(Debug, Deserialize)]
struct CompositeItemError {
    #[serde(rename = "statusCode")]
    status_code: String,
    message: String,
    #[serde(default)]
    fields: Vec<String>,
}

impl CompositeResponse {
    /// Re-align the remote's reference-keyed results with input order.
    ///
    /// Records the reply never mentions (the remote reports only created
    /// ids, or only failures, depending on `hasErrors`) get the outcome
    /// implied by the overall flag.
    fn into_item_results(self, len: usize) -> Vec<ItemResult> {
        let mut by_index: BTreeMap<usize, ItemResult> = BTreeMap::new();
        for item in self.results {
            let Some(index) = item
                .reference_id
                .strip_prefix("ref")
                .and_then(|n| n.parse::<usize>().ok())
            else {
                warn!(reference = %item.reference_id, "unrecognized composite reference id");
                continue;
            };

            let outcome = if let Some(id) = item.id {
                Ok(RecordId::new(id))
            } else if let Some(first) = item.errors.into_iter().next() {
                Err(ItemError {
                    code: first.status_code,
                    message: first.message,
                    fields: first.fields,
                })
            } else {
                Err(ItemError {
                    code: "UNKNOWN".to_string(),
                    message: "no id and no error in composite reply".to_string(),
                    fields: Vec::new(),
                })
            };
            by_index.insert(index, outcome);
        }

        let missing_message = if self.has_errors {
            "record missing from composite reply"
        } else {
            "record missing from successful composite reply"
        };
        (0..len)
            .map(|i| {
                by_index.remove(&i).unwrap_or_else(|| {
                    Err(ItemError {
                        code: "UNKNOWN".to_string(),
                        message: missing_message.to_string(),
                        fields: Vec::new(),
                    })
                })
            })
            .collect()
    }
}

/// HTTP implementation of the learned-classification seam.
pub struct HttpClassifier {
    http: Client,
    endpoint: String,
    token: String,
}

impl HttpClassifier {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(CLASSIFY_TIMEOUT)
            .build()
            .map_err(ClientError::from)?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            token: token.into(),
        })
    }
}

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    columns: Vec<ClassifyColumn<'a>>,
    targets: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
struct ClassifyColumn<'a> {
    name: &'a str,
    samples: &'a [String],
}

#[derive(Debug, Deserialize)]
struct ClassifyReplyEntry {
    source: String,
    target: String,
    confidence: u8,
    #[serde(default)]
    reasoning: String,
}

#[async_trait]
impl ClassifierService for HttpClassifier {
    fn is_configured(&self) -> bool {
        !self.endpoint.is_empty()
    }

    async fn classify(
        &self,
        columns: &[ColumnSample],
        vocabulary: &[TargetField],
    ) -> std::result::Result<Vec<FieldMapping>, ClassifierError> {
        let request = ClassifyRequest {
            columns: columns
                .iter()
                .map(|c| ClassifyColumn {
                    name: &c.name,
                    samples: &c.values,
                })
                .collect(),
            targets: vocabulary.iter().map(TargetField::as_str).collect(),
        };

        let response = self
            .http
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .json(&request)
            .send()
            .await
            .map_err(|e| ClassifierError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClassifierError::Transport(format!(
                "classification service returned status {}",
                response.status()
            )));
        }

        let entries: Vec<ClassifyReplyEntry> = response
            .json()
            .await
            .map_err(|e| ClassifierError::Parse(e.to_string()))?;

        let mappings = entries
            .into_iter()
            .filter_map(|entry| {
                let Some(target) = TargetField::parse(&entry.target) else {
                    warn!(
                        source = %entry.source,
                        target = %entry.target,
                        "classification reply names an unknown target field, dropping"
                    );
                    return None;
                };
                Some(FieldMapping {
                    source_field: entry.source,
                    target_field: target,
                    confidence: entry.confidence.min(100),
                    reasoning: entry.reasoning,
                    suggested_transformation: None,
                })
            })
            .collect();
        Ok(mappings)
    }
}
