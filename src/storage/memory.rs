//! In-memory storage, used by tests and for `--no-cache` dry runs.

use async_trait::async_trait;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use super::{normalize_path, path_matches, FindMatch, Storage};
use crate::error::Result;
use crate::pipeline::Cancellation;

#[derive(Default, Clone)]
pub struct MemoryStorage {
    root: String,
    data: Arc<Mutex<BTreeMap<String, (Vec<u8>, u64)>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            root: String::new(),
            data: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    fn full_key(&self, key: &str) -> String {
        if self.root.is_empty() {
            key.to_string()
        } else {
            format!("{}/{key}", self.root)
        }
    }

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn find(
        &self,
        pattern: &Regex,
        base_dir: Option<&str>,
        filter: Option<&HashMap<String, String>>,
        max: Option<usize>,
        cancellation: &Cancellation,
    ) -> Result<Vec<FindMatch>> {
        let prefix = match base_dir {
            Some(dir) => self.full_key(dir),
            None => self.root.clone(),
        };
        let data = self.data.lock().unwrap();
        let mut out = Vec::new();
        for (key, (_, created_at)) in data.iter() {
            cancellation.check()?;
            if !prefix.is_empty() && !key.starts_with(&prefix) {
                continue;
            }
            let relative = if self.root.is_empty() {
                key.clone()
            } else {
                key.strip_prefix(&format!("{}/", self.root))
                    .unwrap_or(key)
                    .to_string()
            };
            let normalized = normalize_path(&relative);
            let mut metadata = HashMap::new();
            if path_matches(pattern, &normalized, filter, &mut metadata) {
                out.push(FindMatch {
                    path: normalized,
                    metadata,
                    created_at: Some(*created_at),
                });
                if let Some(m) = max {
                    if out.len() >= m {
                        break;
                    }
                }
            }
        }
        Ok(out)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let full = self.full_key(key);
        Ok(self.data.lock().unwrap().get(&full).map(|(b, _)| b.clone()))
    }

    async fn set(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let full = self.full_key(key);
        self.data.lock().unwrap().insert(full, (bytes, Self::now()));
        Ok(())
    }

    async fn has(&self, key: &str) -> Result<bool> {
        let full = self.full_key(key);
        Ok(self.data.lock().unwrap().contains_key(&full))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let full = self.full_key(key);
        self.data.lock().unwrap().remove(&full);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        if self.root.is_empty() {
            data.clear();
        } else {
            let prefix = format!("{}/", self.root);
            data.retain(|k, _| !k.starts_with(&prefix) && k != &self.root);
        }
        Ok(())
    }

    async fn get_creation_date(&self, key: &str) -> Result<Option<u64>> {
        let full = self.full_key(key);
        Ok(self.data.lock().unwrap().get(&full).map(|(_, c)| *c))
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let data = self.data.lock().unwrap();
        let prefix = if self.root.is_empty() {
            String::new()
        } else {
            format!("{}/", self.root)
        };
        Ok(data
            .keys()
            .filter(|k| prefix.is_empty() || k.starts_with(&prefix))
            .map(|k| k.strip_prefix(&prefix).unwrap_or(k).to_string())
            .collect())
    }

    fn create_child(&self, name: &str) -> Box<dyn Storage> {
        let root = if self.root.is_empty() {
            name.to_string()
        } else {
            format!("{}/{name}", self.root)
        };
        Box::new(MemoryStorage {
            root,
            data: self.data.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Cancellation;

    #[tokio::test]
    async fn set_get_roundtrip() {
        let s = MemoryStorage::new();
        s.set("a.json", b"hello".to_vec()).await.unwrap();
        assert_eq!(s.get("a.json").await.unwrap(), Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn has_and_delete() {
        let s = MemoryStorage::new();
        s.set("a.json", b"x".to_vec()).await.unwrap();
        assert!(s.has("a.json").await.unwrap());
        s.delete("a.json").await.unwrap();
        assert!(!s.has("a.json").await.unwrap());
    }

    #[tokio::test]
    async fn child_is_scoped() {
        let s = MemoryStorage::new();
        let child = s.create_child("sub");
        child.set("x.json", b"1".to_vec()).await.unwrap();
        s.set("y.json", b"2".to_vec()).await.unwrap();

        assert!(child.has("x.json").await.unwrap());
        assert!(!s.has("x.json").await.unwrap());
        assert_eq!(s.keys().await.unwrap().len(), 2); // "y.json" + "sub/x.json"
    }

    #[tokio::test]
    async fn child_clear_does_not_touch_peers() {
        let s = MemoryStorage::new();
        let child_a = s.create_child("a");
        let child_b = s.create_child("b");
        child_a.set("x.json", b"1".to_vec()).await.unwrap();
        child_b.set("y.json", b"2".to_vec()).await.unwrap();

        child_a.clear().await.unwrap();

        assert!(!child_a.has("x.json").await.unwrap());
        assert!(child_b.has("y.json").await.unwrap());
    }

    #[tokio::test]
    async fn find_matches_pattern_and_captures_groups() {
        let s = MemoryStorage::new();
        s.set("docs/report-2024.txt", b"hi".to_vec()).await.unwrap();
        s.set("docs/notes.md", b"hi".to_vec()).await.unwrap();

        let pattern = Regex::new(r"report-(?P<year>\d+)\.txt$").unwrap();
        let matches = s
            .find(&pattern, None, None, None, &Cancellation::new())
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].metadata.get("year"), Some(&"2024".to_string()));
    }

    #[tokio::test]
    async fn find_filter_is_case_insensitive_regex_over_metadata() {
        let s = MemoryStorage::new();
        s.set("a.txt", b"1".to_vec()).await.unwrap();
        s.set("b.txt", b"2".to_vec()).await.unwrap();

        let pattern = Regex::new(r"(?P<name>[ab])\.txt$").unwrap();
        let mut filter = HashMap::new();
        filter.insert("name".to_string(), "^A$".to_string());

        let matches = s
            .find(&pattern, None, Some(&filter), None, &Cancellation::new())
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].path, "a.txt");
    }

    #[tokio::test]
    async fn find_respects_max() {
        let s = MemoryStorage::new();
        for i in 0..5 {
            s.set(&format!("f{i}.txt"), b"x".to_vec()).await.unwrap();
        }
        let pattern = Regex::new(r"\.txt$").unwrap();
        let matches = s
            .find(&pattern, None, None, Some(2), &Cancellation::new())
            .await
            .unwrap();
        assert_eq!(matches.len(), 2);
    }
}
