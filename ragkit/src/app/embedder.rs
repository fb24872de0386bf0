use crate::{config::AppConfig, err, error::RagError, map_err};
use ragkit_embedders::{
    gemini::GeminiEmbedder,
    ollama::{OllamaBatchEmbedder, OllamaClient, OllamaEmbedder},
    Embedder, EmbedderKind,
};
use std::sync::Arc;
use tracing::info;

/// Build the embedder selected by `embedder.kind`.
///
/// * `config`: Application configuration.
/// * `client`: Ollama client shared with the generator.
pub fn create_embedder(
    config: &AppConfig,
    client: OllamaClient,
) -> Result<Arc<dyn Embedder>, RagError> {
    let embedder: Arc<dyn Embedder> = match config.embedder.kind {
        EmbedderKind::OllamaDirect => Arc::new(OllamaEmbedder::new(
            client,
            &config.ollama.embedding_model,
        )),
        EmbedderKind::OllamaBatch => Arc::new(OllamaBatchEmbedder::new(
            client,
            &config.ollama.embedding_model,
        )),
        EmbedderKind::Online => {
            let Some(key) = config.embedder.api_key.as_deref().filter(|k| !k.is_empty()) else {
                return err!(
                    InvalidEmbedder,
                    "the online embedder requires embedder.api_key or GEMINI_API_KEY"
                );
            };
            let embedder = map_err!(GeminiEmbedder::new(key, &config.embedder.online_model));
            Arc::new(embedder.with_retry(config.ollama.retry_policy()))
        }
    };

    info!(
        "Using '{}' embedder with model '{}'",
        embedder.id(),
        embedder.model()
    );

    Ok(embedder)
}
