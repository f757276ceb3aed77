use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::{EmbeddingClient, EmbeddingError};

/// Client for the Ollama `/api/embeddings` endpoint.
pub struct OllamaEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
    max_retries: u32,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f64>,
}

impl OllamaEmbedder {
    pub fn new(
        base_url: String,
        model: String,
        api_key: Option<SecretString>,
        timeout_secs: u64,
        max_retries: u32,
    ) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
            max_retries,
        })
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f64>, EmbeddingError> {
        let url = format!("{}/api/embeddings", self.base_url);
        let mut request =
            self.client.post(&url).json(&json!({ "model": self.model, "prompt": text }));
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Status { status: status.as_u16(), body });
        }

        let payload: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Payload(format!("invalid embeddings response: {e}")))?;
        validate_vector(payload.embedding)
    }
}

fn validate_vector(vector: Vec<f64>) -> Result<Vec<f64>, EmbeddingError> {
    if vector.is_empty() {
        return Err(EmbeddingError::Payload("server returned an empty embedding".to_string()));
    }
    if vector.iter().any(|value| !value.is_finite()) {
        return Err(EmbeddingError::Payload(
            "server returned a non-finite embedding component".to_string(),
        ));
    }
    Ok(vector)
}

#[async_trait]
impl EmbeddingClient for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f64>, EmbeddingError> {
        let attempts = self.max_retries + 1;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.request_embedding(text).await {
                Ok(vector) => return Ok(vector),
                Err(error) => {
                    warn!(attempt, attempts, %error, "embedding request failed");
                    last_error = error.to_string();
                }
            }
        }

        Err(EmbeddingError::RetriesExhausted { attempts, last_error })
    }

    fn provider_name(&self) -> &'static str {
        "ollama"
    }
}
