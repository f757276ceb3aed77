use crate::domain::report::FunnelMetrics;

/// Division that treats an empty denominator as 0.0 instead of NaN.
pub fn safe_ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64
}

/// Distinct-customer counts at each funnel stage, measured over events that
/// happened after each customer's latest recommendation batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FunnelCounts {
    pub recommended_customers: u64,
    pub clicked_customers: u64,
    pub cart_customers: u64,
    pub purchased_customers: u64,
}

impl FunnelCounts {
    pub fn into_metrics(self, aov: f64) -> FunnelMetrics {
        FunnelMetrics {
            recommended_customers: self.recommended_customers,
            clicked_customers: self.clicked_customers,
            cart_customers: self.cart_customers,
            purchased_customers: self.purchased_customers,
            ctr: safe_ratio(self.clicked_customers, self.recommended_customers),
            cart_rate: safe_ratio(self.cart_customers, self.clicked_customers),
            conversion_rate: safe_ratio(self.purchased_customers, self.cart_customers),
            aov,
        }
    }
}

/// Mean of per-customer purchase totals, 0.0 when nobody purchased.
pub fn average(totals: &[f64]) -> f64 {
    if totals.is_empty() {
        return 0.0;
    }
    totals.iter().sum::<f64>() / totals.len() as f64
}
