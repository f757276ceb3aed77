pub mod hash;
pub mod ollama;

use async_trait::async_trait;
use thiserror::Error;

use shopsight_core::config::{EmbeddingConfig, EmbeddingProvider};

pub use hash::HashEmbedder;
pub use ollama::OllamaEmbedder;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("embedding server returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unusable embedding payload: {0}")]
    Payload(String),
    #[error("embedding failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
    #[error("embedding client misconfigured: {0}")]
    Misconfigured(String),
}

/// Turns product text into a dense vector. Implementations must be
/// deterministic for identical input within one run.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f64>, EmbeddingError>;

    /// Short provider name for logs.
    fn provider_name(&self) -> &'static str;
}

pub fn client_from_config(
    config: &EmbeddingConfig,
) -> Result<Box<dyn EmbeddingClient>, EmbeddingError> {
    match config.provider {
        EmbeddingProvider::Ollama => {
            let base_url = config
                .base_url
                .as_deref()
                .ok_or_else(|| {
                    EmbeddingError::Misconfigured(
                        "ollama provider requires a base url".to_string(),
                    )
                })?
                .to_string();
            Ok(Box::new(OllamaEmbedder::new(
                base_url,
                config.model.clone(),
                config.api_key.clone(),
                config.timeout_secs,
                config.max_retries,
            )?))
        }
        EmbeddingProvider::Hash => Ok(Box::new(HashEmbedder::new(config.dimension))),
    }
}
