use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shopsight_core::domain::customer::CustomerId;
use shopsight_core::domain::event::{Event, EventId, EventKind};
use shopsight_core::domain::product::ProductId;
use sqlx::{sqlite::SqliteRow, Row};

use super::{parse_timestamp, EventRepository, RepositoryError};
use crate::DbPool;

/// Per-customer purchase aggregate over events whose product is still in the
/// catalog.
#[derive(Clone, Debug, PartialEq)]
pub struct PurchaseRollup {
    pub customer_id: CustomerId,
    pub frequency: u64,
    pub last_purchase_at: DateTime<Utc>,
    pub monetary: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SegmentPurchaseCount {
    pub label: String,
    pub product_id: ProductId,
    pub purchases: u64,
}

pub struct SqlEventRepository {
    pool: DbPool,
}

impl SqlEventRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for SqlEventRepository {
    async fn append(&self, event: &Event) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO events (id, customer_id, product_id, kind, occurred_at, dwell_time_secs)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.id.0)
        .bind(&event.customer_id.0)
        .bind(&event.product_id.0)
        .bind(event.kind.as_str())
        .bind(event.occurred_at.to_rfc3339())
        .bind(event.dwell_time_secs)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Event>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer_id, product_id, kind, occurred_at, dwell_time_secs
            FROM events
            ORDER BY occurred_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(event_from_row).collect()
    }

    async fn history_counts(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<(ProductId, EventKind, u64)>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, kind, COUNT(*) AS count
            FROM events
            WHERE customer_id = ?
            GROUP BY product_id, kind
            "#,
        )
        .bind(&customer_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let product_id: String = row.try_get("product_id")?;
                let kind: String = row.try_get("kind")?;
                let count: i64 = row.try_get("count")?;
                let kind = EventKind::parse(&kind)
                    .ok_or_else(|| RepositoryError::Decode(format!("invalid kind: {kind}")))?;
                Ok((ProductId(product_id), kind, count.max(0) as u64))
            })
            .collect()
    }

    async fn purchase_summaries(&self) -> Result<Vec<PurchaseRollup>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT
                e.customer_id,
                COUNT(*) AS frequency,
                MAX(e.occurred_at) AS last_purchase_at,
                SUM(p.price) AS monetary
            FROM events e
            JOIN products p ON p.id = e.product_id
            WHERE e.kind = 'purchase'
            GROUP BY e.customer_id
            ORDER BY e.customer_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let customer_id: String = row.try_get("customer_id")?;
                let frequency: i64 = row.try_get("frequency")?;
                let last_purchase_at: String = row.try_get("last_purchase_at")?;
                Ok(PurchaseRollup {
                    customer_id: CustomerId(customer_id),
                    frequency: frequency.max(0) as u64,
                    last_purchase_at: parse_timestamp("last_purchase_at", last_purchase_at)?,
                    monetary: row.try_get("monetary")?,
                })
            })
            .collect()
    }

    async fn segment_purchase_counts(
        &self,
    ) -> Result<Vec<SegmentPurchaseCount>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT s.label, e.product_id, COUNT(*) AS purchases
            FROM events e
            JOIN segments s ON s.customer_id = e.customer_id
            WHERE e.kind = 'purchase'
            GROUP BY s.label, e.product_id
            ORDER BY s.label ASC, purchases DESC, e.product_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let label: String = row.try_get("label")?;
                let product_id: String = row.try_get("product_id")?;
                let purchases: i64 = row.try_get("purchases")?;
                Ok(SegmentPurchaseCount {
                    label,
                    product_id: ProductId(product_id),
                    purchases: purchases.max(0) as u64,
                })
            })
            .collect()
    }
}

fn event_from_row(row: &SqliteRow) -> Result<Event, RepositoryError> {
    let id: String = row.try_get("id")?;
    let customer_id: String = row.try_get("customer_id")?;
    let product_id: String = row.try_get("product_id")?;
    let kind: String = row.try_get("kind")?;
    let occurred_at: String = row.try_get("occurred_at")?;

    Ok(Event {
        id: EventId(id),
        customer_id: CustomerId(customer_id),
        product_id: ProductId(product_id),
        kind: EventKind::parse(&kind)
            .ok_or_else(|| RepositoryError::Decode(format!("invalid kind: {kind}")))?,
        occurred_at: parse_timestamp("occurred_at", occurred_at)?,
        dwell_time_secs: row.try_get("dwell_time_secs")?,
    })
}
