use std::collections::{HashMap, HashSet};

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use shopsight_core::config::RecommendationConfig;
use shopsight_core::domain::customer::CustomerId;
use shopsight_core::domain::product::ProductId;
use shopsight_core::domain::recommendation::{RecommendationBatch, RecommendationId};
use shopsight_core::ranking::{EventWeights, RecommendationRanker};
use shopsight_db::repositories::{
    CustomerRepository, EmbeddingRepository, EventRepository, ProductRepository,
    RecommendationRepository, SegmentRepository,
};

use crate::{StageError, StageReport};

/// Generates a fresh recommendation batch for every customer and appends it
/// to the history.
///
/// Customers with interaction history get embedding-similarity rankings
/// weighted by how strongly they interacted; cold-start customers get the
/// popular products of their segment, or the overall catalog by popularity.
pub async fn run(
    customers: &dyn CustomerRepository,
    events: &dyn EventRepository,
    products: &dyn ProductRepository,
    embeddings: &dyn EmbeddingRepository,
    segments: &dyn SegmentRepository,
    recommendations: &dyn RecommendationRepository,
    config: &RecommendationConfig,
) -> Result<StageReport, StageError> {
    let population = customers.list().await?;
    if population.is_empty() {
        warn!("no customers found; nothing to recommend");
        return Ok(StageReport::new("recommend", 0, 0, "no customers found".to_string()));
    }

    let candidates: Vec<ProductId> =
        products.list().await?.into_iter().map(|product| product.id).collect();
    if candidates.is_empty() {
        return Err(StageError::Precondition(
            "no products in the catalog; run ingest-products first".to_string(),
        ));
    }

    let vectors = embeddings.load_all().await?;
    let popularity_order = products.list_by_popularity().await?;
    let labels: HashMap<CustomerId, String> = segments
        .list()
        .await?
        .into_iter()
        .map(|assignment| (assignment.customer_id, assignment.label))
        .collect();

    // Already ordered by purchases descending within each label.
    let mut segment_popular: HashMap<String, Vec<ProductId>> = HashMap::new();
    for count in events.segment_purchase_counts().await? {
        segment_popular.entry(count.label).or_default().push(count.product_id);
    }

    let ranker = RecommendationRanker {
        weights: EventWeights {
            click: config.click_weight,
            cart: config.cart_weight,
            purchase: config.purchase_weight,
        },
        segment_boost: config.segment_boost,
        fallback_confidence: config.fallback_confidence,
        top_n: config.top_n,
    };

    let generated_at = Utc::now();
    let mut processed = 0usize;
    let mut skipped = 0usize;

    for customer in &population {
        let label_popular = labels
            .get(&customer.id)
            .and_then(|label| segment_popular.get(label))
            .map(Vec::as_slice);

        let counts = events.history_counts(&customer.id).await?;
        let picks = if counts.is_empty() {
            let ordered = label_popular.filter(|list| !list.is_empty()).unwrap_or(&popularity_order);
            ranker.fallback(ordered)
        } else {
            let history = ranker.history_weights(&counts);
            let popular_set: HashSet<ProductId> =
                label_popular.map(|list| list.iter().cloned().collect()).unwrap_or_default();
            ranker.rank(&history, &vectors, &candidates, &popular_set)
        };

        if picks.is_empty() {
            warn!(customer_id = %customer.id.0, "no scorable candidates; skipping customer");
            skipped += 1;
            continue;
        }

        let (product_ids, scores): (Vec<ProductId>, Vec<f64>) = picks.into_iter().unzip();
        let batch = RecommendationBatch::new(
            RecommendationId(format!("rec-{}", Uuid::new_v4())),
            customer.id.clone(),
            product_ids,
            scores,
            generated_at,
        )?;
        recommendations.append(&batch).await?;
        processed += 1;
    }

    info!(customers = processed, skipped, "recommendation batches appended");

    Ok(StageReport::new(
        "recommend",
        processed,
        skipped,
        format!("generated batches for {processed} customers, skipped {skipped}"),
    ))
}
