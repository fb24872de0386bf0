//! Clients for the model providers ragkit talks to.
//!
//! Every embedding backend implements [Embedder] so the engine can hold any of
//! them behind an `Arc<dyn Embedder>`.

use serde::{Deserialize, Serialize};

pub mod error;
pub mod retry;

/// Ollama HTTP API client, used for embeddings and text generation.
#[cfg(feature = "ollama")]
pub mod ollama;

/// Google Gemini embeddings over the public REST API.
#[cfg(feature = "gemini")]
pub mod gemini;

use error::ModelError;

/// Operations every embedding backend supports.
#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    /// Short identifier of the backend.
    fn id(&self) -> &'static str;

    /// The model used to produce embeddings.
    fn model(&self) -> &str;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError>;

    /// Embed many texts, preserving their order.
    ///
    /// The default implementation calls [Embedder::embed] once per text.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ModelError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Whether the backend is reachable and able to serve requests.
    async fn check_health(&self) -> bool;
}

/// The embedding backends that can be selected through configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedderKind {
    /// One `/api/embeddings` request per text.
    #[default]
    OllamaDirect,

    /// A single `/api/embed` request per batch.
    OllamaBatch,

    /// Hosted Gemini embedding model.
    Online,
}

impl EmbedderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OllamaDirect => "ollama_direct",
            Self::OllamaBatch => "ollama_batch",
            Self::Online => "online",
        }
    }
}

impl std::fmt::Display for EmbedderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EmbedderKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ollama_direct" => Ok(Self::OllamaDirect),
            "ollama_batch" => Ok(Self::OllamaBatch),
            "online" => Ok(Self::Online),
            other => Err(ModelError::InvalidModel(format!(
                "unsupported embedder type '{other}'"
            ))),
        }
    }
}
