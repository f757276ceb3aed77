pub mod config;
pub mod domain;
pub mod errors;
pub mod interest;
pub mod metrics;
pub mod ranking;
pub mod segmentation;
pub mod taxonomy;

pub use domain::customer::{Customer, CustomerId};
pub use domain::event::{Event, EventId, EventKind};
pub use domain::product::{Product, ProductId};
pub use domain::recommendation::{RecommendationBatch, RecommendationId};
pub use domain::report::{FunnelMetrics, MetricsReport, SegmentMetrics};
pub use domain::segment::SegmentAssignment;
pub use errors::DomainError;
pub use interest::InterestScorer;
pub use metrics::{safe_ratio, FunnelCounts};
pub use ranking::{cosine_similarity, EventWeights, RecommendationRanker};
pub use segmentation::{PurchaseSummary, RfmWeights, SegmentationEngine};
pub use taxonomy::{CategoryProfile, Subcategory, Taxonomy};
