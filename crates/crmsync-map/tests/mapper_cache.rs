//! Durable cache behavior across mapper instances.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crmsync_map::{
    ClassifierError, ClassifierService, FileCache, Mapper, MappingSource,
};
use crmsync_model::{ColumnSample, FieldMapping, TargetField};

/// Remote double that counts calls and answers with a fixed mapping.
struct CountingRemote {
    calls: AtomicUsize,
}

impl CountingRemote {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ClassifierService for CountingRemote {
    fn is_configured(&self) -> bool {
        true
    }

    async fn classify(
        &self,
        columns: &[ColumnSample],
        _vocabulary: &[TargetField],
    ) -> Result<Vec<FieldMapping>, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(columns
            .iter()
            .map(|c| FieldMapping {
                source_field: c.name.clone(),
                target_field: TargetField::Industry,
                confidence: 75,
                reasoning: "learned".to_string(),
                suggested_transformation: None,
            })
            .collect())
    }
}

fn cryptic_columns() -> Vec<ColumnSample> {
    // Headings no rule or alias recognizes, forcing the remote path.
    ["col_a", "col_b", "col_c"]
        .iter()
        .map(|n| ColumnSample::new(*n, vec!["sample".to_string()]))
        .collect()
}

#[tokio::test]
async fn cache_survives_mapper_restarts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let remote = CountingRemote::new();
    let columns = cryptic_columns();

    {
        let cache = Arc::new(FileCache::open(dir.path()).expect("open cache"));
        let mapper = Mapper::new(cache, remote.clone());
        let outcome = mapper.map(&columns).await;
        assert_eq!(outcome.source, MappingSource::Remote);
        assert!(!outcome.cache_hit);
    }

    // A fresh mapper over the same directory serves the stored result.
    let cache = Arc::new(FileCache::open(dir.path()).expect("reopen cache"));
    let mapper = Mapper::new(cache, remote.clone());
    let outcome = mapper.map(&columns).await;

    assert_eq!(outcome.source, MappingSource::Cache);
    assert!(outcome.cache_hit);
    assert!(!outcome.remote_attempted);
    assert_eq!(outcome.mappings.len(), 3);
    assert_eq!(outcome.mappings[0].target_field, TargetField::Industry);
    assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn different_shapes_get_separate_entries() {
    let dir = tempfile::tempdir().expect("tempdir");
    let remote = CountingRemote::new();
    let cache = Arc::new(FileCache::open(dir.path()).expect("open cache"));
    let mapper = Mapper::new(cache, remote.clone());

    mapper.map(&cryptic_columns()).await;

    let other: Vec<ColumnSample> = ["col_x", "col_y", "col_z"]
        .iter()
        .map(|n| ColumnSample::new(*n, Vec::new()))
        .collect();
    let outcome = mapper.map(&other).await;

    assert!(!outcome.cache_hit);
    assert_eq!(remote.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn concurrent_identical_requests_share_one_fill() {
    let dir = tempfile::tempdir().expect("tempdir");
    let remote = CountingRemote::new();
    let cache = Arc::new(FileCache::open(dir.path()).expect("open cache"));
    let mapper = Arc::new(Mapper::new(cache, remote.clone()));

    let columns = cryptic_columns();
    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let mapper = Arc::clone(&mapper);
            let columns = columns.clone();
            tokio::spawn(async move { mapper.map(&columns).await })
        })
        .collect();

    for task in tasks {
        let outcome = task.await.expect("mapping task");
        assert_eq!(outcome.mappings.len(), 3);
    }

    // Fills for one key are serialized; the winner's entry serves the rest.
    assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
}
