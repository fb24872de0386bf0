use crate::{
    error::{check_status, ModelError},
    retry::{retry, RetryPolicy},
    Embedder,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, error, info};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the subset of the Ollama HTTP API used for retrieval
/// and generation.
#[derive(Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl OllamaClient {
    /// Create a new client. Trailing slashes in `base_url` are ignored.
    ///
    /// * `base_url`: Where the Ollama server listens, e.g. `http://localhost:11434`.
    /// * `timeout`: Timeout for every request except health checks.
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        info!("Initializing Ollama client at {base_url}");
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Generate the embedding for a single text with the legacy
    /// `/api/embeddings` endpoint.
    pub async fn embedding(&self, text: &str, model: &str) -> Result<Vec<f32>, ModelError> {
        let request = &EmbeddingRequest {
            model,
            prompt: text,
        };

        let response: EmbeddingResponse = retry(&self.retry, "Ollama embedding", move || {
            self.post("api/embeddings", request)
        })
        .await
        .inspect_err(|e| error!("Ollama embedding request failed: {e}"))?;

        match response.embedding {
            Some(embedding) if !embedding.is_empty() => {
                debug!("Generated embedding, dimension: {}", embedding.len());
                Ok(embedding)
            }
            _ => Err(ModelError::EmptyEmbedding),
        }
    }

    /// Generate embeddings for a batch of texts with the `/api/embed` endpoint.
    pub async fn embed(&self, input: &[&str], model: &str) -> Result<Vec<Vec<f32>>, ModelError> {
        if input.is_empty() {
            return Err(ModelError::InvalidInput(format!(
                "cannot be empty (len = {})",
                input.len()
            )));
        }

        let request = &EmbedRequest { model, input };

        let response: EmbedResponse =
            retry(&self.retry, "Ollama embed", move || self.post("api/embed", request))
                .await
                .inspect_err(|e| error!("Ollama embed request failed: {e}"))?;

        if response.embeddings.len() != input.len()
            || response.embeddings.iter().any(|e| e.is_empty())
        {
            return Err(ModelError::EmptyEmbedding);
        }

        debug!(
            "Embedded {} text(s) with '{model}', dimension: {}",
            input.len(),
            response.embeddings[0].len()
        );

        Ok(response.embeddings)
    }

    /// Run a non streaming completion.
    ///
    /// * `prompt`: The full prompt.
    /// * `model`: Generation model.
    /// * `options`: Extra top level request fields, e.g. `options`, `system` or `keep_alive`.
    pub async fn generate(
        &self,
        prompt: &str,
        model: &str,
        options: &Map<String, Value>,
    ) -> Result<String, ModelError> {
        let request = &GenerateRequest {
            model,
            prompt,
            stream: false,
            extra: options,
        };

        let response: GenerateResponse =
            retry(&self.retry, "Ollama generate", move || self.post("api/generate", request))
                .await
                .inspect_err(|e| error!("Ollama generate request failed: {e}"))?;

        let text = response.response.unwrap_or_default();
        debug!("Generated text, length: {}", text.len());
        Ok(text)
    }

    /// List the names of the models available on the server.
    /// Failures are logged and result in an empty list.
    pub async fn list_models(&self) -> Vec<String> {
        let result = async {
            let response = self
                .client
                .get(self.url("api/tags"))
                .timeout(self.timeout)
                .send()
                .await?;
            let response = check_status(response).await?;
            Ok::<_, ModelError>(response.json::<TagsResponse>().await?)
        }
        .await;

        match result {
            Ok(tags) => tags.models.into_iter().map(|m| m.name).collect(),
            Err(e) => {
                error!("Failed to list Ollama models: {e}");
                vec![]
            }
        }
    }

    /// Returns true if the server answers `/api/tags` with 200.
    pub async fn check_health(&self) -> bool {
        match self
            .client
            .get(self.url("api/tags"))
            .timeout(HEALTH_CHECK_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(e) => {
                debug!("Ollama health check failed: {e}");
                false
            }
        }
    }

    async fn post<Req, Res>(&self, path: &str, body: &Req) -> Result<Res, ModelError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.url(path))
            .timeout(self.timeout)
            .json(body)
            .send()
            .await?;

        let response = check_status(response).await?;

        Ok(response.json().await?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

impl std::fmt::Debug for OllamaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Embeds every text with its own `/api/embeddings` request.
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: OllamaClient,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(client: OllamaClient, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl Embedder for OllamaEmbedder {
    fn id(&self) -> &'static str {
        "ollama_direct"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        self.client.embedding(text, &self.model).await
    }

    async fn check_health(&self) -> bool {
        self.client.check_health().await
    }
}

/// Embeds whole batches with a single `/api/embed` request.
#[derive(Debug, Clone)]
pub struct OllamaBatchEmbedder {
    client: OllamaClient,
    model: String,
}

impl OllamaBatchEmbedder {
    pub fn new(client: OllamaClient, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl Embedder for OllamaBatchEmbedder {
    fn id(&self) -> &'static str {
        "ollama_batch"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        let mut embeddings = self.client.embed(&[text], &self.model).await?;
        embeddings.pop().ok_or(ModelError::EmptyEmbedding)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ModelError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        self.client.embed(texts, &self.model).await
    }

    async fn check_health(&self) -> bool {
        self.client.check_health().await
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Option<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(flatten)]
    extra: &'a Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::serve;
    use axum::{
        extract::State,
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    fn client(url: &str) -> OllamaClient {
        OllamaClient::new(url, Duration::from_secs(5))
            .with_retry(RetryPolicy::new(3, Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn embedding_sends_model_and_prompt() {
        let router = Router::new().route(
            "/api/embeddings",
            post(|Json(body): Json<Value>| async move {
                assert_eq!("bge-m3", body["model"]);
                assert_eq!("hello", body["prompt"]);
                Json(json!({ "embedding": [0.1, 0.2, 0.3] }))
            }),
        );
        let url = serve(router).await;

        let embedding = client(&format!("{url}/")).embedding("hello", "bge-m3").await.unwrap();

        assert_eq!(vec![0.1, 0.2, 0.3], embedding);
    }

    #[tokio::test]
    async fn embedding_missing_vector_is_an_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .route(
                "/api/embeddings",
                post(|State(calls): State<Arc<AtomicUsize>>| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Json(json!({ "embedding": [] }))
                }),
            )
            .with_state(calls.clone());
        let url = serve(router).await;

        let result = client(&url).embedding("hello", "bge-m3").await;

        assert!(matches!(result, Err(ModelError::EmptyEmbedding)));
        assert_eq!(1, calls.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn embedding_retries_server_errors() {
        let calls = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .route(
                "/api/embeddings",
                post(|State(calls): State<Arc<AtomicUsize>>| async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        return Err(StatusCode::INTERNAL_SERVER_ERROR);
                    }
                    Ok(Json(json!({ "embedding": [1.0] })))
                }),
            )
            .with_state(calls.clone());
        let url = serve(router).await;

        let embedding = client(&url).embedding("hello", "bge-m3").await.unwrap();

        assert_eq!(vec![1.0], embedding);
        assert_eq!(3, calls.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn embedding_does_not_retry_client_errors() {
        let calls = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .route(
                "/api/embeddings",
                post(|State(calls): State<Arc<AtomicUsize>>| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::NOT_FOUND, "model 'nope' not found")
                }),
            )
            .with_state(calls.clone());
        let url = serve(router).await;

        let result = client(&url).embedding("hello", "nope").await;

        match result {
            Err(ModelError::Status { status, body, .. }) => {
                assert_eq!(404, status);
                assert!(body.contains("not found"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
        assert_eq!(1, calls.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn unreachable_server_fails() {
        let client = OllamaClient::new("http://127.0.0.1:1", Duration::from_secs(1))
            .with_retry(RetryPolicy::none());

        assert!(client.embedding("text", "model").await.is_err());
        assert!(!client.check_health().await);
        assert!(client.list_models().await.is_empty());
    }

    #[tokio::test]
    async fn batch_embed_keeps_order() {
        let router = Router::new().route(
            "/api/embed",
            post(|Json(body): Json<Value>| async move {
                let input = body["input"].as_array().unwrap().clone();
                let embeddings: Vec<Vec<f32>> = input
                    .iter()
                    .map(|s| vec![s.as_str().unwrap().len() as f32])
                    .collect();
                Json(json!({ "embeddings": embeddings }))
            }),
        );
        let url = serve(router).await;

        let embedder = OllamaBatchEmbedder::new(client(&url), "bge-m3");
        let embeddings = embedder.embed_batch(&["a", "bbb", "cc"]).await.unwrap();

        assert_eq!(vec![vec![1.0], vec![3.0], vec![2.0]], embeddings);
        assert_eq!(vec![3.0], embedder.embed("xyz").await.unwrap());
        assert!(embedder.embed_batch(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn generate_flattens_options() {
        let router = Router::new().route(
            "/api/generate",
            post(|Json(body): Json<Value>| async move {
                assert_eq!("qwen2.5:7b", body["model"]);
                assert_eq!(false, body["stream"]);
                assert_eq!(0.2, body["options"]["temperature"]);
                Json(json!({ "response": "generated text", "done": true }))
            }),
        );
        let url = serve(router).await;

        let mut options = Map::new();
        options.insert("options".to_string(), json!({ "temperature": 0.2 }));

        let text = client(&url)
            .generate("prompt", "qwen2.5:7b", &options)
            .await
            .unwrap();

        assert_eq!("generated text", text);
    }

    #[tokio::test]
    async fn list_models_and_health() {
        let router = Router::new().route(
            "/api/tags",
            get(|| async {
                Json(json!({ "models": [{ "name": "bge-m3" }, { "name": "qwen2.5:7b" }] }))
            }),
        );
        let url = serve(router).await;
        let client = client(&url);

        assert!(client.check_health().await);
        assert_eq!(vec!["bge-m3", "qwen2.5:7b"], client.list_models().await);
    }

    #[tokio::test]
    async fn direct_embedder_uses_single_requests() {
        let calls = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .route(
                "/api/embeddings",
                post(|State(calls): State<Arc<AtomicUsize>>| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Json(json!({ "embedding": [0.5, 0.5] }))
                }),
            )
            .with_state(calls.clone());
        let url = serve(router).await;

        let embedder = OllamaEmbedder::new(client(&url), "bge-m3");
        let embeddings = embedder.embed_batch(&["one", "two", "three"]).await.unwrap();

        assert_eq!(3, embeddings.len());
        assert_eq!(3, calls.load(Ordering::SeqCst));
        assert_eq!("bge-m3", embedder.model());
    }
}
