//! Storage abstraction (spec §4.1, §6). Key-addressed byte blobs plus a
//! thin JSON-array table layer on top. Two in-core implementors exist:
//! [`memory::MemoryStorage`] and [`fs::FsStorage`]; external blob/filesystem
//! adapters are out of scope for the core and consume only this trait.

pub mod fs;
pub mod memory;

use async_trait::async_trait;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

use crate::error::{GraphRagError, Result};
use crate::pipeline::Cancellation;

#[derive(Debug, Clone)]
pub struct FindMatch {
    pub path: String,
    /// Named capture groups from the pattern, plus any filter keys matched.
    pub metadata: HashMap<String, String>,
    pub created_at: Option<u64>,
}

#[async_trait]
pub trait Storage: Send + Sync {
    async fn find(
        &self,
        pattern: &Regex,
        base_dir: Option<&str>,
        filter: Option<&HashMap<String, String>>,
        max: Option<usize>,
        cancellation: &Cancellation,
    ) -> Result<Vec<FindMatch>>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn set(&self, key: &str, bytes: Vec<u8>) -> Result<()>;
    async fn has(&self, key: &str) -> Result<bool>;
    async fn delete(&self, key: &str) -> Result<()>;
    async fn clear(&self) -> Result<()>;
    async fn get_creation_date(&self, key: &str) -> Result<Option<u64>>;
    async fn keys(&self) -> Result<Vec<String>>;

    /// Return a view scoped to the named subtree. All operations on the
    /// child, including `clear()`, must not touch peer subtrees.
    fn create_child(&self, name: &str) -> Box<dyn Storage>;
}

/// `find` path matching is always done against `/`-normalized form, and a
/// `filter` value is itself a case-insensitive regex over the metadata
/// value's string form (spec §4.1).
pub fn path_matches(
    pattern: &Regex,
    normalized_path: &str,
    filter: Option<&HashMap<String, String>>,
    metadata: &mut HashMap<String, String>,
) -> bool {
    let caps = match pattern.captures(normalized_path) {
        Some(c) => c,
        None => return false,
    };
    for name in pattern.capture_names().flatten() {
        if let Some(m) = caps.name(name) {
            metadata.insert(name.to_string(), m.as_str().to_string());
        }
    }

    if let Some(filter) = filter {
        for (key, pattern_str) in filter {
            let value = match metadata.get(key) {
                Some(v) => v,
                None => return false,
            };
            let re = match Regex::new(&format!("(?i){pattern_str}")) {
                Ok(r) => r,
                Err(_) => return false,
            };
            if !re.is_match(value) {
                return false;
            }
        }
    }

    true
}

pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Load a table (a JSON array stored under `{name}.json`). Fails with
/// `NotFound` if the key is absent.
pub async fn load_table<T: DeserializeOwned>(storage: &dyn Storage, name: &str) -> Result<Vec<T>> {
    let key = format!("{name}.json");
    let bytes = storage
        .get(&key)
        .await?
        .ok_or_else(|| GraphRagError::NotFound(key.clone()))?;
    serde_json::from_slice(&bytes).map_err(GraphRagError::from)
}

/// Load a table, returning an empty vec if the key is absent (used by
/// workflows that tolerate a missing upstream table, e.g. resumed runs).
pub async fn load_table_or_empty<T: DeserializeOwned>(
    storage: &dyn Storage,
    name: &str,
) -> Result<Vec<T>> {
    match load_table(storage, name).await {
        Ok(rows) => Ok(rows),
        Err(GraphRagError::NotFound(_)) => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

pub async fn write_table<T: Serialize>(
    storage: &dyn Storage,
    name: &str,
    rows: &[T],
) -> Result<()> {
    let key = format!("{name}.json");
    let bytes = serde_json::to_vec_pretty(rows)?;
    storage.set(&key, bytes).await
}
