use super::document::Document;
use crate::error::RagError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Distance function used to rank search results. Lower is closer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distance {
    /// Squared euclidean distance.
    #[default]
    L2,

    /// `1 - cosine similarity`.
    Cosine,

    /// `1 - dot product`.
    Ip,
}

impl Distance {
    /// Both vectors must have the same length.
    pub fn between(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::L2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
            Self::Cosine => {
                let norm_a = norm(a);
                let norm_b = norm(b);
                if norm_a == 0.0 || norm_b == 0.0 {
                    return 1.0;
                }
                1.0 - dot(a, b) / (norm_a * norm_b)
            }
            Self::Ip => 1.0 - dot(a, b),
        }
    }
}

impl std::fmt::Display for Distance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::L2 => write!(f, "l2"),
            Self::Cosine => write!(f, "cosine"),
            Self::Ip => write!(f, "ip"),
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(a: &[f32]) -> f32 {
    dot(a, a).sqrt()
}

/// A document chunk with its embedding, ready for storage.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedDocument {
    pub document: Document,
    pub embedding: Vec<f32>,
}

impl EmbeddedDocument {
    pub fn new(document: Document, embedding: Vec<f32>) -> Self {
        Self {
            document,
            embedding,
        }
    }

    pub fn id(&self) -> String {
        document_id(&self.document)
    }
}

/// Deterministic ID of a document, `{source}_{sha256(source + content)}`.
/// The same chunk of the same file always maps to the same ID.
pub fn document_id(document: &Document) -> String {
    let source = document.source().unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(document.content.as_bytes());

    format!("{source}_{}", hex::encode(hasher.finalize()))
}

/// Restricts which stored documents a search considers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilter {
    /// Every entry must be equal to the document's metadata entry.
    pub where_metadata: Map<String, Value>,

    /// The document content must contain this string.
    pub where_document: Option<String>,
}

impl SearchFilter {
    pub fn matches(&self, content: &str, metadata: &Map<String, Value>) -> bool {
        let metadata_matches = self
            .where_metadata
            .iter()
            .all(|(key, value)| metadata.get(key) == Some(value));

        let content_matches = self
            .where_document
            .as_deref()
            .map_or(true, |needle| content.contains(needle));

        metadata_matches && content_matches
    }
}

/// A single search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub document: Document,
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub document_count: usize,
    pub persist_directory: PathBuf,
    pub dimension: Option<usize>,
    pub distance: Distance,
}

/// Storage for embedded documents, scoped to a single collection.
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    fn id(&self) -> &'static str;

    /// Store documents, skipping the ones whose ID already exists.
    /// Returns the amount of documents actually added.
    ///
    /// * `documents`: Documents with their embeddings.
    /// * `batch_size`: Amount of documents written at once.
    async fn add_documents(
        &self,
        documents: &[EmbeddedDocument],
        batch_size: usize,
    ) -> Result<usize, RagError>;

    /// Return the documents closest to `query`, ordered by ascending distance.
    ///
    /// * `query`: The query embedding.
    /// * `n_results`: Maximum amount of results.
    /// * `filter`: Restricts the candidate documents.
    async fn search_similar(
        &self,
        query: &[f32],
        n_results: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<SearchHit>, RagError>;

    /// Delete documents by ID. Returns the amount of documents removed.
    async fn delete_documents(&self, ids: &[String]) -> Result<usize, RagError>;

    /// Replace the document stored under `id`.
    async fn update_document(&self, id: &str, document: EmbeddedDocument) -> Result<(), RagError>;

    async fn count(&self) -> Result<usize, RagError>;

    /// Names of all collections in the store's directory.
    async fn list_collections(&self) -> Result<Vec<String>, RagError>;

    /// Remove every document from the collection.
    async fn clear_collection(&self) -> Result<(), RagError>;

    async fn collection_info(&self) -> Result<CollectionInfo, RagError>;
}
