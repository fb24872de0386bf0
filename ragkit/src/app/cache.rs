use crate::{error::RagError, map_err};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, warn};

/// File backed cache of text embeddings, one JSON file per text.
#[derive(Debug, Clone)]
pub struct EmbeddingCache {
    dir: PathBuf,
    ttl: Option<Duration>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    embedding: Vec<f32>,
    created_at: DateTime<Utc>,
}

impl EmbeddingCache {
    /// Create the cache, creating `dir` if necessary.
    ///
    /// * `dir`: Where entries are stored.
    /// * `ttl`: Seconds an entry stays valid, 0 keeps entries forever.
    pub fn new(dir: impl AsRef<Path>, ttl: u64) -> Result<Self, RagError> {
        let dir = dir.as_ref().to_path_buf();
        map_err!(std::fs::create_dir_all(&dir));

        Ok(Self {
            dir,
            ttl: (ttl > 0).then(|| Duration::from_secs(ttl)),
        })
    }

    fn key(text: &str) -> String {
        hex::encode(Sha256::digest(text.as_bytes()))
    }

    fn entry_path(&self, text: &str) -> PathBuf {
        self.dir.join(format!("{}.json", Self::key(text)))
    }

    /// The cached embedding of `text`. Expired and unreadable entries are removed.
    pub async fn get(&self, text: &str) -> Option<Vec<f32>> {
        let path = self.entry_path(text);

        let bytes = tokio::fs::read(&path).await.ok()?;

        let entry = match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Corrupt cache entry '{}': {e}", path.display());
                remove(&path).await;
                return None;
            }
        };

        if let Some(ttl) = self.ttl {
            let age = Utc::now()
                .signed_duration_since(entry.created_at)
                .to_std()
                .unwrap_or_default();
            if age > ttl {
                debug!("Cache entry '{}' expired", path.display());
                remove(&path).await;
                return None;
            }
        }

        debug!("Cache hit for '{}'", path.display());

        Some(entry.embedding)
    }

    /// Store the embedding of `text`. Failures are logged, not returned.
    pub async fn set(&self, text: &str, embedding: &[f32]) {
        self.write(text, embedding, Utc::now()).await
    }

    async fn write(&self, text: &str, embedding: &[f32], created_at: DateTime<Utc>) {
        let path = self.entry_path(text);
        let entry = CacheEntry {
            embedding: embedding.to_vec(),
            created_at,
        };

        let result = match serde_json::to_vec(&entry) {
            Ok(json) => tokio::fs::write(&path, json).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        if let Err(e) = result {
            warn!("Unable to write cache entry '{}': {e}", path.display());
        }
    }

    /// Remove every entry. Returns the amount of entries removed.
    pub async fn clear(&self) -> Result<usize, RagError> {
        let mut entries = map_err!(tokio::fs::read_dir(&self.dir).await);
        let mut removed = 0;

        while let Some(entry) = map_err!(entries.next_entry().await) {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                map_err!(tokio::fs::remove_file(&path).await);
                removed += 1;
            }
        }

        debug!("Removed {removed} cache entries");

        Ok(removed)
    }
}

async fn remove(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!("Unable to remove cache entry '{}': {e}", path.display());
    }
}
