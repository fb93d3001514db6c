use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use clipsight_common::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::warn;

/// What kind of analysis a cache entry holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisKind {
    Summary,
    Mindmap,
    ArticleMindmap,
}

impl AnalysisKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::Summary => "summary",
            AnalysisKind::Mindmap => "mindmap",
            AnalysisKind::ArticleMindmap => "article_mindmap",
        }
    }
}

/// Cached analysis result with the time it was produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: Value,
    pub timestamp: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            timestamp: Utc::now(),
        }
    }

    pub fn is_fresh(&self, max_age: Duration) -> bool {
        Utc::now() - self.timestamp <= max_age
    }
}

/// Key-value store for analysis results
#[async_trait]
pub trait AnalysisCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>>;
    async fn set(&self, key: &str, entry: CacheEntry) -> Result<()>;
}

/// `{kind}_{sha256(provider|model|language|content)}`
pub fn cache_key(kind: AnalysisKind, provider: &str, model: &str, language: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    for part in [provider, model, language] {
        hasher.update(part.as_bytes());
        hasher.update(b"|");
    }
    hasher.update(content.as_bytes());
    format!("{}_{}", kind.as_str(), hex::encode(hasher.finalize()))
}

/// Process-local cache
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnalysisCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, entry: CacheEntry) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }
}

/// Cache persisted as one pretty-printed JSON file, rewritten on every set
#[derive(Debug)]
pub struct JsonFileCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    file_path: PathBuf,
}

impl JsonFileCache {
    /// Load existing entries; a corrupt file starts an empty cache
    pub fn load(path: &Path) -> Result<Self> {
        let entries = if path.exists() {
            let data = fs::read_to_string(path)?;
            serde_json::from_str(&data).unwrap_or_else(|e| {
                warn!("Ignoring unreadable cache file {}: {}", path.display(), e);
                HashMap::new()
            })
        } else {
            HashMap::new()
        };

        Ok(Self {
            entries: RwLock::new(entries),
            file_path: path.to_path_buf(),
        })
    }

    async fn save(&self, entries: &HashMap<String, CacheEntry>) -> Result<()> {
        let data = serde_json::to_string_pretty(entries)?;
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.file_path, data).await?;
        Ok(())
    }
}

#[async_trait]
impl AnalysisCache for JsonFileCache {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, entry: CacheEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), entry);
        self.save(&entries).await
    }
}
