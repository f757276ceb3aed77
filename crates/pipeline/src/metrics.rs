use std::collections::{HashMap, HashSet};

use chrono::Utc;
use tracing::{info, warn};

use shopsight_core::domain::event::EventKind;
use shopsight_core::domain::product::ProductId;
use shopsight_core::domain::report::{MetricsReport, SegmentMetrics};
use shopsight_core::metrics::{average, FunnelCounts};
use shopsight_db::repositories::{
    EventRepository, ProductRepository, RecommendationRepository, ReportRepository,
    SegmentRepository,
};

use crate::{StageError, StageReport};

/// Computes the recommendation funnel and per-segment engagement, and appends
/// the result to the report history.
///
/// Funnel stages count distinct customers whose events touched a recommended
/// product after their latest batch was generated. Average order value covers
/// all purchase history, not just post-recommendation purchases.
pub async fn run(
    events: &dyn EventRepository,
    products: &dyn ProductRepository,
    segments: &dyn SegmentRepository,
    recommendations: &dyn RecommendationRepository,
    reports: &dyn ReportRepository,
) -> Result<StageReport, StageError> {
    let batches = recommendations.latest_per_customer().await?;
    if batches.is_empty() {
        warn!("no recommendation batches found; run recommend first");
    }

    let all_events = events.list_all().await?;
    let prices: HashMap<ProductId, f64> =
        products.list().await?.into_iter().map(|product| (product.id, product.price)).collect();

    let mut counts = FunnelCounts { recommended_customers: batches.len() as u64, ..Default::default() };
    for batch in &batches {
        let recommended: HashSet<&ProductId> = batch.product_ids.iter().collect();
        let mut clicked = false;
        let mut carted = false;
        let mut purchased = false;

        for event in &all_events {
            if event.customer_id != batch.customer_id
                || event.occurred_at <= batch.generated_at
                || !recommended.contains(&event.product_id)
            {
                continue;
            }
            match event.kind {
                EventKind::Click => clicked = true,
                EventKind::AddToCart => carted = true,
                EventKind::Purchase => purchased = true,
                EventKind::View => {}
            }
        }

        counts.clicked_customers += u64::from(clicked);
        counts.cart_customers += u64::from(carted);
        counts.purchased_customers += u64::from(purchased);
    }

    // Spend per customer over the whole purchase history.
    let mut spend_per_customer: HashMap<&str, f64> = HashMap::new();
    for event in &all_events {
        if event.kind != EventKind::Purchase {
            continue;
        }
        if let Some(price) = prices.get(&event.product_id) {
            *spend_per_customer.entry(event.customer_id.0.as_str()).or_insert(0.0) += price;
        }
    }
    let totals: Vec<f64> = spend_per_customer.values().copied().collect();
    let overall = counts.into_metrics(average(&totals));

    let assignments = segments.list().await?;
    let mut labels: Vec<String> = assignments
        .iter()
        .map(|assignment| assignment.label.clone())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    labels.sort();

    let mut segment_metrics = Vec::with_capacity(labels.len());
    for label in labels {
        let members: HashSet<&str> = assignments
            .iter()
            .filter(|assignment| assignment.label == label)
            .map(|assignment| assignment.customer_id.0.as_str())
            .collect();

        let mut active: HashSet<&str> = HashSet::new();
        let mut purchasing: HashSet<&str> = HashSet::new();
        let mut purchase_prices: Vec<f64> = Vec::new();
        for event in &all_events {
            let customer = event.customer_id.0.as_str();
            if !members.contains(customer) {
                continue;
            }
            active.insert(customer);
            if event.kind == EventKind::Purchase {
                purchasing.insert(customer);
                if let Some(price) = prices.get(&event.product_id) {
                    purchase_prices.push(*price);
                }
            }
        }

        segment_metrics.push(SegmentMetrics {
            label,
            active_customers: active.len() as u64,
            purchasing_customers: purchasing.len() as u64,
            avg_purchase_value: average(&purchase_prices),
        });
    }

    let report = MetricsReport {
        overall,
        segments: segment_metrics,
        generated_at: Utc::now(),
    };
    reports.append(&report).await?;

    info!(
        recommended = report.overall.recommended_customers,
        ctr = report.overall.ctr,
        segments = report.segments.len(),
        "funnel report appended"
    );

    let processed = report.segments.len() + 1;
    Ok(StageReport::new(
        "report",
        processed,
        0,
        format!(
            "funnel over {} customers with {} segment rollups",
            report.overall.recommended_customers,
            report.segments.len()
        ),
    ))
}
