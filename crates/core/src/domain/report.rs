use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Funnel ratios over the most recent recommendation batch per customer.
/// Every ratio is 0.0 when its denominator is zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunnelMetrics {
    pub recommended_customers: u64,
    pub clicked_customers: u64,
    pub cart_customers: u64,
    pub purchased_customers: u64,
    pub ctr: f64,
    pub cart_rate: f64,
    pub conversion_rate: f64,
    pub aov: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentMetrics {
    pub label: String,
    pub active_customers: u64,
    pub purchasing_customers: u64,
    pub avg_purchase_value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub overall: FunnelMetrics,
    pub segments: Vec<SegmentMetrics>,
    pub generated_at: DateTime<Utc>,
}

impl MetricsReport {
    pub const KIND: &'static str = "funnel_summary";
}
