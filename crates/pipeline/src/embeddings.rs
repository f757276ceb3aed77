use chrono::Utc;
use tracing::{info, warn};

use shopsight_db::repositories::{EmbeddingRepository, ProductRepository};
use shopsight_embed::EmbeddingClient;

use crate::{StageError, StageReport};

/// Embeds every catalog product's name and description and replaces the
/// stored vectors in one transaction. Products that fail to embed are skipped
/// with a warning so one bad product cannot block the catalog.
pub async fn run(
    products: &dyn ProductRepository,
    embeddings: &dyn EmbeddingRepository,
    client: &dyn EmbeddingClient,
) -> Result<StageReport, StageError> {
    let catalog = products.list().await?;
    if catalog.is_empty() {
        return Err(StageError::Precondition(
            "no products in the catalog; run ingest-products first".to_string(),
        ));
    }

    info!(products = catalog.len(), provider = client.provider_name(), "embedding catalog");

    let mut vectors = Vec::with_capacity(catalog.len());
    let mut skipped = 0usize;
    for product in &catalog {
        match client.embed(&product.embedding_text()).await {
            Ok(vector) => vectors.push((product.id.clone(), vector)),
            Err(error) => {
                warn!(product_id = %product.id.0, %error, "skipping product that failed to embed");
                skipped += 1;
            }
        }
    }

    let processed = vectors.len();
    embeddings.replace_all(&vectors, Utc::now()).await?;

    Ok(StageReport::new(
        "embed",
        processed,
        skipped,
        format!("stored {processed} embeddings, skipped {skipped} products"),
    ))
}
