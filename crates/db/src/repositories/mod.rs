use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use shopsight_core::domain::customer::{Customer, CustomerId};
use shopsight_core::domain::event::{Event, EventKind};
use shopsight_core::domain::product::{Product, ProductId};
use shopsight_core::domain::recommendation::RecommendationBatch;
use shopsight_core::domain::report::MetricsReport;
use shopsight_core::domain::segment::SegmentAssignment;

pub mod customer;
pub mod embedding;
pub mod event;
pub mod product;
pub mod recommendation;
pub mod report;
pub mod segment;

pub use customer::SqlCustomerRepository;
pub use embedding::SqlEmbeddingRepository;
pub use event::{PurchaseRollup, SegmentPurchaseCount, SqlEventRepository};
pub use product::SqlProductRepository;
pub use recommendation::SqlRecommendationRepository;
pub use report::SqlReportRepository;
pub use segment::SqlSegmentRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn upsert(&self, customer: &Customer) -> Result<(), RepositoryError>;
    async fn get(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError>;
    async fn list(&self) -> Result<Vec<Customer>, RepositoryError>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Replaces the whole catalog in one transaction.
    async fn replace_all(&self, products: &[Product]) -> Result<(), RepositoryError>;
    async fn get(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError>;
    async fn list(&self) -> Result<Vec<Product>, RepositoryError>;
    /// Catalog ids ordered by popularity descending, id ascending on ties.
    async fn list_by_popularity(&self) -> Result<Vec<ProductId>, RepositoryError>;
}

#[async_trait]
pub trait EmbeddingRepository: Send + Sync {
    async fn replace_all(
        &self,
        embeddings: &[(ProductId, Vec<f64>)],
        generated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
    async fn load_all(&self) -> Result<HashMap<ProductId, Vec<f64>>, RepositoryError>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn append(&self, event: &Event) -> Result<(), RepositoryError>;
    async fn list_all(&self) -> Result<Vec<Event>, RepositoryError>;
    /// Per-product interaction counts for one customer, grouped by kind.
    async fn history_counts(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<(ProductId, EventKind, u64)>, RepositoryError>;
    /// Purchase frequency, last purchase time, and spend per customer,
    /// limited to purchase events whose product is still in the catalog.
    async fn purchase_summaries(&self) -> Result<Vec<PurchaseRollup>, RepositoryError>;
    /// Purchase counts per product within each segment label.
    async fn segment_purchase_counts(
        &self,
    ) -> Result<Vec<SegmentPurchaseCount>, RepositoryError>;
}

#[async_trait]
pub trait SegmentRepository: Send + Sync {
    async fn replace_all(&self, assignments: &[SegmentAssignment]) -> Result<(), RepositoryError>;
    async fn get(&self, id: &CustomerId) -> Result<Option<SegmentAssignment>, RepositoryError>;
    async fn list(&self) -> Result<Vec<SegmentAssignment>, RepositoryError>;
}

#[async_trait]
pub trait RecommendationRepository: Send + Sync {
    async fn append(&self, batch: &RecommendationBatch) -> Result<(), RepositoryError>;
    /// The most recent batch for every customer that has one.
    async fn latest_per_customer(&self) -> Result<Vec<RecommendationBatch>, RepositoryError>;
}

#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn append(&self, report: &MetricsReport) -> Result<(), RepositoryError>;
    async fn latest(&self, kind: &str) -> Result<Option<MetricsReport>, RepositoryError>;
}

pub(crate) fn parse_timestamp(
    column: &str,
    value: String,
) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("invalid timestamp in `{column}`: {e}")))
}
