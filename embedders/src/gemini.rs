use crate::{
    error::{GeminiError, ModelError},
    retry::{retry, RetryPolicy},
    Embedder,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "models/text-embedding-004";

const TASK_TYPE: &str = "RETRIEVAL_DOCUMENT";
const API_KEY_HEADER: &str = "x-goog-api-key";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Embedder backed by the hosted Gemini embedding models.
pub struct GeminiEmbedder {
    client: reqwest::Client,
    endpoint: String,
    key: String,
    model: String,
    retry: RetryPolicy,
}

impl GeminiEmbedder {
    /// * `api_key`: Google AI API key.
    /// * `model`: Embedding model, with or without the `models/` prefix.
    pub fn new(api_key: &str, model: &str) -> Result<Self, ModelError> {
        if api_key.is_empty() {
            return Err(ModelError::InvalidInput(
                "Gemini embedder requires an API key".to_string(),
            ));
        }

        let model = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{model}")
        };

        info!("Initializing Gemini embedder with model {model}");

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            key: api_key.to_string(),
            model,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn post<Req, Res>(&self, method: &str, body: &Req) -> Result<Res, ModelError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let url = format!("{}/v1beta/{}:{method}", self.endpoint, self.model);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.key)
            .timeout(REQUEST_TIMEOUT)
            .json(body)
            .send()
            .await
            .map_err(|e| ModelError::Reqwest(e.without_url()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            error!("Gemini request {method} failed with status {status}");
            return match serde_json::from_str::<GeminiError>(&body) {
                Ok(e) => Err(ModelError::Gemini(e)),
                Err(_) => Err(ModelError::Status {
                    url,
                    status,
                    body,
                }),
            };
        }

        response
            .json()
            .await
            .map_err(|e| ModelError::Reqwest(e.without_url()))
    }

    fn content<'a>(&'a self, text: &'a str) -> EmbedContentRequest<'a> {
        EmbedContentRequest {
            model: &self.model,
            content: Content {
                parts: vec![Part { text }],
            },
            task_type: TASK_TYPE,
        }
    }
}

#[async_trait::async_trait]
impl Embedder for GeminiEmbedder {
    fn id(&self) -> &'static str {
        "online"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        let request = &self.content(text);

        let response: EmbedContentResponse = retry(&self.retry, "Gemini embed", move || {
            self.post("embedContent", request)
        })
        .await?;

        let values = response.embedding.values;
        if values.is_empty() {
            return Err(ModelError::EmptyEmbedding);
        }

        debug!("Generated embedding, dimension: {}", values.len());
        Ok(values)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ModelError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let request = &BatchEmbedRequest {
            requests: texts.iter().map(|text| self.content(text)).collect(),
        };

        let response: BatchEmbedResponse = retry(&self.retry, "Gemini batch embed", move || {
            self.post("batchEmbedContents", request)
        })
        .await?;

        if response.embeddings.len() != texts.len()
            || response.embeddings.iter().any(|e| e.values.is_empty())
        {
            return Err(ModelError::EmptyEmbedding);
        }

        debug!("Embedded {} text(s) with '{}'", texts.len(), self.model);

        Ok(response.embeddings.into_iter().map(|e| e.values).collect())
    }

    async fn check_health(&self) -> bool {
        match self.embed("test").await {
            Ok(embedding) => !embedding.is_empty(),
            Err(e) => {
                error!("Gemini health check failed: {e}");
                false
            }
        }
    }
}

impl std::fmt::Debug for GeminiEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiEmbedder")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}
