use ragkit_embedders::error::ModelError;
use serde_json::{Map, Value};

/// A text generation backend.
#[async_trait::async_trait]
pub trait Generator: Send + Sync {
    /// Complete `prompt` with `model`.
    ///
    /// * `options`: Backend specific generation options, passed through as is.
    async fn generate(
        &self,
        prompt: &str,
        model: &str,
        options: &Map<String, Value>,
    ) -> Result<String, ModelError>;

    /// Names of the models the backend can serve.
    async fn list_models(&self) -> Vec<String>;

    async fn check_health(&self) -> bool;
}
