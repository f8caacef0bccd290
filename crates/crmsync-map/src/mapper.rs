//! Confidence-scored mapper: cache, rules, then an optional remote call.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

use crmsync_model::{ColumnSample, FieldMapping, TargetField};

use crate::cache::{cache_key, MappingCache};
use crate::classifier::RuleClassifier;
use crate::remote::ClassifierService;

/// Rule confidence at or above which a column counts as well-placed.
const RULE_CONFIDENCE_FLOOR: u8 = 85;
/// Fraction of well-placed columns at which the remote call is skipped.
const RULE_FRACTION_TARGET: f64 = 0.8;

/// Where the final mapping came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingSource {
    /// Served from the content-addressed cache; no work performed.
    Cache,
    /// Rule engine alone was confident enough.
    Rules,
    /// Remote classification service supplied the result.
    Remote,
}

/// The mapper's result plus the observability summary callers report.
#[derive(Debug, Clone)]
pub struct MappingOutcome {
    /// One mapping per source column, in input order.
    pub mappings: Vec<FieldMapping>,
    pub source: MappingSource,
    pub cache_hit: bool,
    /// Whether a remote classification call was actually issued.
    pub remote_attempted: bool,
}

/// Wraps the rule classifier with caching and soft remote classification.
///
/// Never returns an error: every failure path degrades to the rule-based
/// result. Cache miss fills are serialized per key so identical concurrent
/// requests issue at most one remote call.
pub struct Mapper {
    classifier: RuleClassifier,
    cache: Arc<dyn MappingCache>,
    remote: Arc<dyn ClassifierService>,
    key_locks: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl Mapper {
    pub fn new(cache: Arc<dyn MappingCache>, remote: Arc<dyn ClassifierService>) -> Self {
        Self {
            classifier: RuleClassifier::new(),
            cache,
            remote,
            key_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Map the given columns to target fields.
    ///
    /// Each [`ColumnSample`] carries the heading and up to five sample
    /// values; samples may be empty when the caller has none.
    pub async fn map(&self, columns: &[ColumnSample]) -> MappingOutcome {
        let key = cache_key(columns);

        // Lock-free fast path.
        if let Some(outcome) = self.cache_lookup(&key) {
            return outcome;
        }

        let lock = self.key_lock(&key);
        let guard = lock.lock().await;

        // Another task may have filled this key while we waited.
        if let Some(outcome) = self.cache_lookup(&key) {
            drop(guard);
            self.discard_key_lock(&key);
            return outcome;
        }

        let outcome = self.compute(columns).await;
        if let Err(e) = self.cache.put(&key, &outcome.mappings) {
            warn!(key = %key, error = %e, "mapping cache write failed, continuing");
        }
        drop(guard);
        self.discard_key_lock(&key);
        outcome
    }

    fn cache_lookup(&self, key: &str) -> Option<MappingOutcome> {
        match self.cache.get(key) {
            Ok(Some(mappings)) => {
                debug!(key = %key, "mapping cache hit");
                Some(MappingOutcome {
                    mappings,
                    source: MappingSource::Cache,
                    cache_hit: true,
                    remote_attempted: false,
                })
            }
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "mapping cache read failed, treating as miss");
                None
            }
        }
    }

    async fn compute(&self, columns: &[ColumnSample]) -> MappingOutcome {
        let names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
        let rule_mappings = self.classifier.classify(&names);

        if rules_sufficient(&rule_mappings) {
            debug!(
                columns = names.len(),
                "rule confidence sufficient, remote classification skipped"
            );
            return MappingOutcome {
                mappings: rule_mappings,
                source: MappingSource::Rules,
                cache_hit: false,
                remote_attempted: false,
            };
        }

        if !self.remote.is_configured() {
            debug!("no classification service configured, using rule result");
            return MappingOutcome {
                mappings: rule_mappings,
                source: MappingSource::Rules,
                cache_hit: false,
                remote_attempted: false,
            };
        }

        match self.remote.classify(columns, TargetField::ALL).await {
            Ok(remote_mappings) => {
                let mappings = reconcile(&names, remote_mappings, &rule_mappings);
                MappingOutcome {
                    mappings,
                    source: MappingSource::Remote,
                    cache_hit: false,
                    remote_attempted: true,
                }
            }
            Err(e) => {
                warn!(error = %e, "remote classification failed, falling back to rules");
                MappingOutcome {
                    mappings: rule_mappings,
                    source: MappingSource::Rules,
                    cache_hit: false,
                    remote_attempted: true,
                }
            }
        }
    }

    fn key_lock(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.key_locks.lock().expect("key lock map poisoned");
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Drop the lock-map entry once a fill has finished. Tasks already
    /// waiting keep their clone of the lock and re-check the cache on
    /// acquisition, so the map never grows with the number of distinct
    /// column shapes seen.
    fn discard_key_lock(&self, key: &str) {
        let mut locks = self.key_locks.lock().expect("key lock map poisoned");
        locks.remove(key);
    }
}

/// Whether the rule result alone is good enough to skip the remote call.
fn rules_sufficient(mappings: &[FieldMapping]) -> bool {
    if mappings.is_empty() {
        return true;
    }
    let confident = mappings
        .iter()
        .filter(|m| m.confidence >= RULE_CONFIDENCE_FLOOR)
        .count();
    confident as f64 / mappings.len() as f64 >= RULE_FRACTION_TARGET
}

/// Align a remote reply with the requested columns.
///
/// The reply may omit columns or mention unknown ones; every requested
/// column gets exactly one mapping, falling back to the rule result where
/// the remote had nothing usable.
fn reconcile(
    names: &[String],
    remote: Vec<FieldMapping>,
    rule_fallback: &[FieldMapping],
) -> Vec<FieldMapping> {
    let mut by_source: HashMap<String, FieldMapping> = remote
        .into_iter()
        .map(|m| (m.source_field.clone(), m))
        .collect();

    names
        .iter()
        .zip(rule_fallback)
        .map(|(name, fallback)| match by_source.remove(name) {
            Some(mut m) => {
                m.confidence = m.confidence.min(100);
                m
            }
            None => fallback.clone(),
        })
        .collect()
}
