use shopsight_core::config::LoadOptions;
use shopsight_db::repositories::{SqlEmbeddingRepository, SqlProductRepository};
use shopsight_embed::client_from_config;
use shopsight_pipeline::embeddings;

use crate::commands::{self, CommandResult};

pub fn run() -> CommandResult {
    commands::execute("embed", LoadOptions::default(), |config, pool| async move {
        let client = client_from_config(&config.embedding)
            .map_err(|error| ("embedding_client", error.to_string(), 6u8))?;

        let products = SqlProductRepository::new(pool.clone());
        let vectors = SqlEmbeddingRepository::new(pool);
        let report = embeddings::run(&products, &vectors, client.as_ref())
            .await
            .map_err(|error| ("stage", error.to_string(), 6u8))?;
        Ok(report.summary)
    })
}
