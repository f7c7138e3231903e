//! Filesystem storage rooted at a directory.

use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{normalize_path, path_matches, FindMatch, Storage};
use crate::error::Result;
use crate::pipeline::Cancellation;

#[derive(Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl Storage for FsStorage {
    async fn find(
        &self,
        pattern: &Regex,
        base_dir: Option<&str>,
        filter: Option<&HashMap<String, String>>,
        max: Option<usize>,
        cancellation: &Cancellation,
    ) -> Result<Vec<FindMatch>> {
        let start = match base_dir {
            Some(dir) => self.root.join(dir),
            None => self.root.clone(),
        };
        let mut out = Vec::new();
        if !start.exists() {
            return Ok(out);
        }
        let mut stack = vec![start.clone()];
        while let Some(dir) = stack.pop() {
            cancellation.check()?;
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(e) => e,
                Err(_) => continue,
            };
            while let Some(entry) = entries.next_entry().await? {
                cancellation.check()?;
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                    continue;
                }
                let relative = path
                    .strip_prefix(&self.root)
                    .unwrap_or(&path)
                    .to_string_lossy()
                    .to_string();
                let normalized = normalize_path(&relative);
                let mut metadata = HashMap::new();
                if path_matches(pattern, &normalized, filter, &mut metadata) {
                    let created_at = tokio::fs::metadata(&path)
                        .await
                        .ok()
                        .and_then(|m| m.created().ok())
                        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                        .map(|d| d.as_secs());
                    out.push(FindMatch {
                        path: normalized,
                        metadata,
                        created_at,
                    });
                    if let Some(m) = max {
                        if out.len() >= m {
                            return Ok(out);
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.resolve(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.resolve(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn has(&self, key: &str) -> Result<bool> {
        Ok(self.resolve(key).exists())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.resolve(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self) -> Result<()> {
        if self.root.exists() {
            tokio::fs::remove_dir_all(&self.root).await?;
        }
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    async fn get_creation_date(&self, key: &str) -> Result<Option<u64>> {
        let path = self.resolve(key);
        match tokio::fs::metadata(&path).await {
            Ok(m) => Ok(m
                .created()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut out = Vec::new();
        if !self.root.exists() {
            return Ok(out);
        }
        let mut stack = vec![self.root.clone()];
        while let Some(dir) = stack.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else {
                    let relative = path
                        .strip_prefix(&self.root)
                        .unwrap_or(&path)
                        .to_string_lossy()
                        .to_string();
                    out.push(normalize_path(&relative));
                }
            }
        }
        out.sort();
        Ok(out)
    }

    fn create_child(&self, name: &str) -> Box<dyn Storage> {
        Box::new(FsStorage {
            root: self.root.join(name),
        })
    }
}

impl FsStorage {
    pub fn root_path(&self) -> &Path {
        &self.root
    }
}
