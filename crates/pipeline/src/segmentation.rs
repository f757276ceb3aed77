use chrono::Utc;
use tracing::{info, warn};

use shopsight_core::config::SegmentationConfig;
use shopsight_core::segmentation::{PurchaseSummary, SegmentationEngine};
use shopsight_db::repositories::{EventRepository, SegmentRepository};

use crate::{StageError, StageReport};

/// Assigns every purchasing customer to a labelled RFM tier and replaces the
/// previous assignments wholesale. When no purchase data exists the stage
/// warns and leaves existing assignments untouched.
pub async fn run(
    events: &dyn EventRepository,
    segments: &dyn SegmentRepository,
    config: &SegmentationConfig,
) -> Result<StageReport, StageError> {
    let rollups = events.purchase_summaries().await?;
    if rollups.is_empty() {
        warn!("no purchase events found; keeping existing segment assignments");
        return Ok(StageReport::new(
            "segment",
            0,
            0,
            "no purchase data; existing assignments were kept".to_string(),
        ));
    }

    let now = Utc::now();
    let summaries: Vec<PurchaseSummary> = rollups
        .into_iter()
        .map(|rollup| PurchaseSummary {
            customer_id: rollup.customer_id,
            frequency: rollup.frequency,
            recency_days: (now - rollup.last_purchase_at).num_days().max(0) as f64,
            monetary: rollup.monetary,
        })
        .collect();

    let engine = SegmentationEngine {
        weights: config.weights,
        clusters: config.clusters,
        labels: config.labels.clone(),
        seed: config.seed,
        max_iterations: config.max_iterations,
    };
    let assignments = engine.assign(&summaries, now)?;

    segments.replace_all(&assignments).await?;
    info!(customers = assignments.len(), clusters = config.clusters, "segmentation complete");

    let processed = assignments.len();
    Ok(StageReport::new(
        "segment",
        processed,
        0,
        format!("assigned {processed} customers across up to {} tiers", config.clusters),
    ))
}
