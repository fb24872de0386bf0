use super::{cache::EmbeddingCache, embedder::create_embedder, vector::fs::FsVectorStore};
use crate::{config::AppConfig, core::engine::RagEngine, error::RagError};
use ragkit_embedders::ollama::OllamaClient;
use std::sync::Arc;

impl RagEngine {
    /// Build an engine from configuration: the Ollama client used for
    /// generation, the configured embedder, the file system vector store and,
    /// if enabled, the embedding cache.
    pub async fn from_config(config: Arc<AppConfig>) -> Result<Self, RagError> {
        let ollama = OllamaClient::new(&config.ollama.base_url, config.ollama.timeout())
            .with_retry(config.ollama.retry_policy());

        let embedder = create_embedder(&config, ollama.clone())?;

        let store = FsVectorStore::open(
            &config.vector_store.persist_directory,
            &config.vector_store.collection_name,
            config.vector_store.distance,
        )
        .await?;

        let cache = if config.cache.enabled {
            Some(EmbeddingCache::new(&config.cache.directory, config.cache.ttl)?)
        } else {
            None
        };

        RagEngine::new(config, Arc::new(ollama), embedder, Arc::new(store), cache)
    }
}
