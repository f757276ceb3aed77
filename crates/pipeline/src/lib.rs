pub mod embeddings;
pub mod ingest;
pub mod metrics;
pub mod recommend;
pub mod segmentation;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StageError {
    #[error("repository error: {0}")]
    Repository(#[from] shopsight_db::repositories::RepositoryError),
    #[error("embedding error: {0}")]
    Embedding(#[from] shopsight_embed::EmbeddingError),
    #[error("domain error: {0}")]
    Domain(#[from] shopsight_core::DomainError),
    #[error("could not read input `{path}`: {source}")]
    InputParse { path: PathBuf, source: csv::Error },
    #[error("stage precondition failed: {0}")]
    Precondition(String),
}

/// Outcome summary for one pipeline stage run.
#[derive(Clone, Debug, serde::Serialize)]
pub struct StageReport {
    pub stage: &'static str,
    pub processed: usize,
    pub skipped: usize,
    pub summary: String,
}

impl StageReport {
    pub fn new(stage: &'static str, processed: usize, skipped: usize, summary: String) -> Self {
        Self { stage, processed, skipped, summary }
    }
}
