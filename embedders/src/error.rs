use serde::Deserialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid model: {0}")]
    InvalidModel(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("response contained no embedding")]
    EmptyEmbedding,

    #[error("request to {url} failed with status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("http client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("{0}")]
    Gemini(#[from] GeminiError),
}

impl ModelError {
    /// Transport failures and server side errors are worth another attempt,
    /// anything else will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Reqwest(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Gemini(e) => e.error.code >= 500 || e.error.code == 429,
            _ => false,
        }
    }
}

#[derive(Debug, Deserialize, Error)]
#[error("{message}, code: {code}, status: {status:?}")]
pub struct GeminiErrorParams {
    pub code: u16,
    pub message: String,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Error)]
#[error("Gemini error response {{ {error} }}")]
pub struct GeminiError {
    pub error: GeminiErrorParams,
}

/// Map non success responses to [ModelError::Status].
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ModelError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    error!("Request to {url} failed with status {status}");

    Err(ModelError::Status { url, status, body })
}
