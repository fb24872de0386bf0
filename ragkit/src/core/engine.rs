//! Retrieval augmented generation over the documents in a [VectorStore].

use super::{
    chunk::Splitter,
    document::{loader::DocumentLoader, Document},
    generator::Generator,
    vector::{CollectionInfo, EmbeddedDocument, SearchFilter, VectorStore},
};
use crate::{app::cache::EmbeddingCache, config::AppConfig, error::RagError, map_err};
use ragkit_embedders::Embedder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};
use tracing::{debug, error, info, warn};

/// Answer returned when no stored document is similar enough to the question.
pub const NO_RESULTS_ANSWER: &str =
    "Sorry, no relevant information was found in the knowledge base.";

const DEFAULT_SYSTEM_PROMPT: &str = "You are a knowledge base assistant. Answer the user's question using the provided context.

Rules:
1. Base the answer on the context, do not make up information
2. If the context does not contain the answer, say so clearly
3. Keep the answer accurate, concise and well structured
4. Cite sources by their document number";

/// Parameters of a single [RagEngine::query].
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    /// Amount of documents to retrieve.
    pub n_results: usize,

    /// Minimum similarity of a retrieved document. Defaults to the configured
    /// `vector_store.similarity_threshold`.
    pub min_similarity: Option<f32>,

    pub system_prompt: Option<String>,

    /// Passed through to the generator.
    pub generation: Map<String, Value>,

    pub filter: SearchFilter,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            n_results: 5,
            min_similarity: None,
            system_prompt: None,
            generation: Map::new(),
            filter: SearchFilter::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub content: String,
    pub source: Option<String>,
    pub similarity_score: f32,
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub question: String,
    pub answer: String,
    pub retrieved_documents: Vec<RetrievedDocument>,
    /// Seconds.
    pub processing_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    pub document_count: usize,
    pub ollama_health: bool,
    pub available_models: Vec<String>,
    pub vector_store: CollectionInfo,
}

/// Ties together document loading, embedding, retrieval and generation.
pub struct RagEngine {
    config: Arc<AppConfig>,
    generator: Arc<dyn Generator>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    cache: Option<EmbeddingCache>,
    loader: Arc<DocumentLoader>,
    splitter: Splitter,
}

impl RagEngine {
    pub fn new(
        config: Arc<AppConfig>,
        generator: Arc<dyn Generator>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        cache: Option<EmbeddingCache>,
    ) -> Result<Self, RagError> {
        let loader = Arc::new(DocumentLoader::new(&config.document));
        let splitter = Splitter::new(&config.document)?;

        info!(
            "RAG engine initialized with '{}' store and '{}' embedder",
            store.id(),
            embedder.id()
        );

        Ok(Self {
            config,
            generator,
            embedder,
            store,
            cache,
            loader,
            splitter,
        })
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Load, chunk, embed and store the documents at `paths`.
    /// Returns the amount of chunks added to the store.
    ///
    /// Paths that fail to load and chunks that fail to embed are logged and skipped.
    ///
    /// * `paths`: Files or directories.
    /// * `recursive`: Whether to descend into subdirectories.
    pub async fn add_documents(&self, paths: &[PathBuf], recursive: bool) -> Result<usize, RagError> {
        let start = Instant::now();
        info!("Adding documents from {} path(s)", paths.len());

        let mut chunks = vec![];

        for path in paths {
            let documents = match self.load(path, recursive).await {
                Ok(documents) => documents,
                Err(e) => {
                    error!("Unable to process '{}': {e}", path.display());
                    continue;
                }
            };

            let before = chunks.len();
            for document in documents.iter() {
                chunks.extend(self.splitter.split_document(document));
            }

            info!(
                "Processed '{}': {} document(s), {} chunk(s)",
                path.display(),
                documents.len(),
                chunks.len() - before
            );
        }

        let embedded = self.embed_chunks(chunks).await;

        let added = self
            .store
            .add_documents(&embedded, self.config.vector_store.batch_size)
            .await?;

        info!(
            "Added {added} chunk(s) in {:.2}s",
            start.elapsed().as_secs_f64()
        );

        Ok(added)
    }

    async fn load(&self, path: &Path, recursive: bool) -> Result<Vec<Document>, RagError> {
        let loader = self.loader.clone();
        let path = path.to_path_buf();

        map_err!(
            tokio::task::spawn_blocking(move || {
                if path.is_dir() {
                    loader.load_documents(&path, recursive)
                } else {
                    loader.load_document(&path).map(|document| vec![document])
                }
            })
            .await
        )
    }

    /// Embed `chunks`, using the cache when enabled. Uncached chunks are embedded
    /// in batches. If a batch fails, its chunks are retried one by one.
    async fn embed_chunks(&self, chunks: Vec<Document>) -> Vec<EmbeddedDocument> {
        let mut embedded = Vec::with_capacity(chunks.len());
        let mut pending = vec![];

        for chunk in chunks {
            match self.cached(&chunk.content).await {
                Some(embedding) => embedded.push(EmbeddedDocument::new(chunk, embedding)),
                None => pending.push(chunk),
            }
        }

        debug!(
            "{} chunk(s) cached, {} to embed",
            embedded.len(),
            pending.len()
        );

        for batch in pending.chunks(self.config.vector_store.batch_size.max(1)) {
            let texts: Vec<&str> = batch.iter().map(|d| d.content.as_str()).collect();

            match self.embedder.embed_batch(&texts).await {
                Ok(embeddings) if embeddings.len() == batch.len() => {
                    for (chunk, embedding) in batch.iter().zip(embeddings) {
                        self.remember(&chunk.content, &embedding).await;
                        embedded.push(EmbeddedDocument::new(chunk.clone(), embedding));
                    }
                }
                Ok(embeddings) => {
                    warn!(
                        "Embedder returned {} embedding(s) for {} chunk(s), embedding one by one",
                        embeddings.len(),
                        batch.len()
                    );
                    self.embed_each(batch, &mut embedded).await;
                }
                Err(e) => {
                    warn!("Batch embedding failed, embedding one by one: {e}");
                    self.embed_each(batch, &mut embedded).await;
                }
            }
        }

        embedded
    }

    async fn embed_each(&self, chunks: &[Document], out: &mut Vec<EmbeddedDocument>) {
        for chunk in chunks {
            match self.embedder.embed(&chunk.content).await {
                Ok(embedding) => {
                    self.remember(&chunk.content, &embedding).await;
                    out.push(EmbeddedDocument::new(chunk.clone(), embedding));
                }
                Err(e) => error!("Unable to embed chunk of {chunk}: {e}"),
            }
        }
    }

    async fn cached(&self, text: &str) -> Option<Vec<f32>> {
        match self.cache {
            Some(ref cache) => cache.get(text).await,
            None => None,
        }
    }

    async fn remember(&self, text: &str, embedding: &[f32]) {
        if let Some(ref cache) = self.cache {
            cache.set(text, embedding).await;
        }
    }

    /// Retrieve the documents most similar to `query` with their similarity,
    /// `1 / (1 + distance)`.
    pub async fn search_documents(
        &self,
        query: &str,
        n_results: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<(Document, f32)>, RagError> {
        let start = Instant::now();
        info!("Searching for: {query}");

        let embedding = map_err!(self.embedder.embed(query).await);
        let hits = self.store.search_similar(&embedding, n_results, filter).await?;

        let results: Vec<(Document, f32)> = hits
            .into_iter()
            .map(|hit| (hit.document, similarity(hit.distance)))
            .collect();

        info!(
            "Search found {} document(s) in {:.2}s",
            results.len(),
            start.elapsed().as_secs_f64()
        );

        Ok(results)
    }

    /// Answer `query` using `documents` as context.
    ///
    /// * `system_prompt`: Replaces the default instructions.
    /// * `options`: Passed through to the generator.
    pub async fn generate_answer(
        &self,
        query: &str,
        documents: &[Document],
        system_prompt: Option<&str>,
        options: &Map<String, Value>,
    ) -> Result<String, RagError> {
        let start = Instant::now();

        let prompt = build_prompt(query, documents, system_prompt);

        let answer = map_err!(
            self.generator
                .generate(&prompt, &self.config.ollama.generation_model, options)
                .await
        );

        info!(
            "Generated answer in {:.2}s",
            start.elapsed().as_secs_f64()
        );

        Ok(answer)
    }

    /// Run retrieval and generation for `question`.
    ///
    /// Generation failures do not fail the query, the error message becomes the answer.
    pub async fn query(&self, question: &str, options: &QueryOptions) -> Result<QueryResult, RagError> {
        let start = Instant::now();
        info!("Query: {question}");

        let min_similarity = options
            .min_similarity
            .unwrap_or(self.config.vector_store.similarity_threshold);

        let results: Vec<(Document, f32)> = self
            .search_documents(question, options.n_results, &options.filter)
            .await?
            .into_iter()
            .filter(|(_, score)| *score >= min_similarity)
            .collect();

        if results.is_empty() {
            info!("No document passed the similarity threshold {min_similarity}");
            return Ok(QueryResult {
                question: question.to_string(),
                answer: NO_RESULTS_ANSWER.to_string(),
                retrieved_documents: vec![],
                processing_time: 0.0,
            });
        }

        let context: Vec<Document> = results.iter().map(|(doc, _)| doc.clone()).collect();

        let answer = match self
            .generate_answer(
                question,
                &context,
                options.system_prompt.as_deref(),
                &options.generation,
            )
            .await
        {
            Ok(answer) => answer,
            Err(e) => {
                e.print();
                format!("error while generating answer: {e}")
            }
        };

        let processing_time = start.elapsed().as_secs_f64();
        info!("Query finished in {processing_time:.2}s");

        Ok(QueryResult {
            question: question.to_string(),
            answer,
            retrieved_documents: results
                .into_iter()
                .map(|(document, similarity_score)| RetrievedDocument {
                    content: document.content,
                    source: document.source,
                    similarity_score,
                    metadata: document.metadata,
                })
                .collect(),
            processing_time,
        })
    }

    pub async fn stats(&self) -> Result<EngineStats, RagError> {
        Ok(EngineStats {
            document_count: self.store.count().await?,
            ollama_health: self.generator.check_health().await,
            available_models: self.generator.list_models().await,
            vector_store: self.store.collection_info().await?,
        })
    }

    /// Remove every document from the store.
    pub async fn clear(&self) -> Result<(), RagError> {
        self.store.clear_collection().await
    }

    /// Remove every cached embedding. Returns the amount of entries removed,
    /// 0 when caching is disabled.
    pub async fn clear_cache(&self) -> Result<usize, RagError> {
        match self.cache {
            Some(ref cache) => cache.clear().await,
            None => Ok(0),
        }
    }
}

/// Map a distance to a similarity in `(0, 1]`. Negative distances count as 0.
pub fn similarity(distance: f32) -> f32 {
    1.0 / (1.0 + distance.max(0.0))
}

fn build_prompt(query: &str, documents: &[Document], system_prompt: Option<&str>) -> String {
    let context = documents
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            format!(
                "Document {} (source: {}):\n{}",
                i + 1,
                doc.source().unwrap_or("unknown"),
                doc.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let system_prompt = system_prompt.unwrap_or(DEFAULT_SYSTEM_PROMPT);

    format!(
        "{system_prompt}\n\nContext:\n{context}\n\nQuestion: {query}\n\nAnswer based on the context above:"
    )
}
