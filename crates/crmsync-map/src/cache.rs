//! Content-addressed mapping cache.
//!
//! Keys are hex-encoded SHA-256 digests over the schema version, the
//! ordered column names, and the names of sampled columns. Entries are
//! durable JSON blobs with no TTL; a vocabulary change rotates
//! [`SCHEMA_VERSION`], which invalidates every stale key automatically.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

use sha2::{Digest, Sha256};

use crmsync_model::{ColumnSample, FieldMapping};

use crate::error::CacheError;

/// Version tag folded into every cache key.
///
/// Bump when the target vocabulary or mapping semantics change so old
/// entries stop resolving.
pub const SCHEMA_VERSION: &str = "v1";

/// Durable store for mapping results keyed by content hash.
///
/// Reads take no locks beyond the store's own; miss-path fills are
/// serialized per key by the mapper, not here.
pub trait MappingCache: Send + Sync {
    /// Look up a cached mapping list.
    fn get(&self, key: &str) -> Result<Option<Vec<FieldMapping>>, CacheError>;

    /// Store a mapping list under `key`, replacing any previous entry.
    fn put(&self, key: &str, mappings: &[FieldMapping]) -> Result<(), CacheError>;

    /// Drop every entry.
    fn clear(&self) -> Result<(), CacheError>;
}

/// Compute the cache key for a mapping request.
///
/// Hashes the schema version, each column name in order, and the name of
/// each column that carries sample values. Sample *values* are excluded:
/// two exports with the same shape share one entry.
#[must_use]
pub fn cache_key(columns: &[ColumnSample]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(SCHEMA_VERSION.as_bytes());
    hasher.update([0xff]);
    for column in columns {
        hasher.update(column.name.as_bytes());
        hasher.update([0x00]);
    }
    hasher.update([0xfe]);
    for column in columns.iter().filter(|c| !c.values.is_empty()) {
        hasher.update(column.name.as_bytes());
        hasher.update([0x00]);
    }
    hex::encode(hasher.finalize())
}

/// File-backed cache: one `<key>.json` blob per entry under a directory.
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Open a cache rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl MappingCache for FileCache {
    fn get(&self, key: &str) -> Result<Option<Vec<FieldMapping>>, CacheError> {
        let path = self.entry_path(key);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mappings = serde_json::from_slice(&data)?;
        Ok(Some(mappings))
    }

    fn put(&self, key: &str, mappings: &[FieldMapping]) -> Result<(), CacheError> {
        let payload = serde_json::to_vec_pretty(mappings)?;
        // Write through a temp file so a concurrent reader never sees a
        // partial entry.
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        fs::write(&tmp, payload)?;
        fs::rename(&tmp, self.entry_path(key))?;
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.path().extension().is_some_and(|ext| ext == "json") {
                fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }
}

/// In-memory cache for tests and short-lived runs.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Vec<FieldMapping>>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl MappingCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Vec<FieldMapping>>, CacheError> {
        Ok(self
            .entries
            .read()
            .expect("cache lock poisoned")
            .get(key)
            .cloned())
    }

    fn put(&self, key: &str, mappings: &[FieldMapping]) -> Result<(), CacheError> {
        self.entries
            .write()
            .expect("cache lock poisoned")
            .insert(key.to_string(), mappings.to_vec());
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.entries.write().expect("cache lock poisoned").clear();
        Ok(())
    }
}
