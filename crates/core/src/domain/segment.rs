use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerId;

/// One active segment assignment per customer. Replaced wholesale on each
/// segmentation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentAssignment {
    pub customer_id: CustomerId,
    pub label: String,
    pub score: f64,
    pub assigned_at: DateTime<Utc>,
}
