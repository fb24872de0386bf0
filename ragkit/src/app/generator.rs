use crate::core::generator::Generator;
use ragkit_embedders::{error::ModelError, ollama::OllamaClient};
use serde_json::{Map, Value};

#[async_trait::async_trait]
impl Generator for OllamaClient {
    async fn generate(
        &self,
        prompt: &str,
        model: &str,
        options: &Map<String, Value>,
    ) -> Result<String, ModelError> {
        OllamaClient::generate(self, prompt, model, options).await
    }

    async fn list_models(&self) -> Vec<String> {
        OllamaClient::list_models(self).await
    }

    async fn check_health(&self) -> bool {
        OllamaClient::check_health(self).await
    }
}
