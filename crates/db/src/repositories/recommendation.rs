use async_trait::async_trait;
use shopsight_core::domain::customer::CustomerId;
use shopsight_core::domain::product::ProductId;
use shopsight_core::domain::recommendation::{RecommendationBatch, RecommendationId};
use sqlx::{sqlite::SqliteRow, Row};

use super::{parse_timestamp, RecommendationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlRecommendationRepository {
    pool: DbPool,
}

impl SqlRecommendationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecommendationRepository for SqlRecommendationRepository {
    async fn append(&self, batch: &RecommendationBatch) -> Result<(), RepositoryError> {
        let product_ids: Vec<&str> = batch.product_ids.iter().map(|id| id.0.as_str()).collect();
        let product_ids_json = serde_json::to_string(&product_ids)
            .map_err(|e| RepositoryError::Decode(format!("could not encode product ids: {e}")))?;
        let scores_json = serde_json::to_string(&batch.scores)
            .map_err(|e| RepositoryError::Decode(format!("could not encode scores: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO recommendations (id, customer_id, product_ids_json, scores_json, generated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&batch.id.0)
        .bind(&batch.customer_id.0)
        .bind(product_ids_json)
        .bind(scores_json)
        .bind(batch.generated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn latest_per_customer(&self) -> Result<Vec<RecommendationBatch>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT r.id, r.customer_id, r.product_ids_json, r.scores_json, r.generated_at
            FROM recommendations r
            JOIN (
                SELECT customer_id, MAX(generated_at) AS generated_at
                FROM recommendations
                GROUP BY customer_id
            ) latest
            ON latest.customer_id = r.customer_id AND latest.generated_at = r.generated_at
            ORDER BY r.customer_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(batch_from_row).collect()
    }
}

fn batch_from_row(row: &SqliteRow) -> Result<RecommendationBatch, RepositoryError> {
    let id: String = row.try_get("id")?;
    let customer_id: String = row.try_get("customer_id")?;
    let product_ids_json: String = row.try_get("product_ids_json")?;
    let scores_json: String = row.try_get("scores_json")?;
    let generated_at: String = row.try_get("generated_at")?;

    let product_ids: Vec<String> = serde_json::from_str(&product_ids_json)
        .map_err(|e| RepositoryError::Decode(format!("invalid product_ids_json: {e}")))?;
    let scores: Vec<f64> = serde_json::from_str(&scores_json)
        .map_err(|e| RepositoryError::Decode(format!("invalid scores_json: {e}")))?;

    RecommendationBatch::new(
        RecommendationId(id),
        CustomerId(customer_id),
        product_ids.into_iter().map(ProductId).collect(),
        scores,
        parse_timestamp("generated_at", generated_at)?,
    )
    .map_err(|e| RepositoryError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use shopsight_core::domain::customer::CustomerId;
    use shopsight_core::domain::product::ProductId;
    use shopsight_core::domain::recommendation::{RecommendationBatch, RecommendationId};

    use super::{RecommendationRepository, SqlRecommendationRepository};
    use crate::{connect_with_settings, migrations};

    async fn setup_pool() -> crate::DbPool {
        let pool =
            connect_with_settings("sqlite::memory:?cache=shared", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    fn batch(id: &str, customer: &str, day: u32, products: &[&str]) -> RecommendationBatch {
        RecommendationBatch::new(
            RecommendationId(id.to_string()),
            CustomerId(customer.to_string()),
            products.iter().map(|p| ProductId((*p).to_string())).collect(),
            products.iter().enumerate().map(|(i, _)| 1.0 - i as f64 * 0.1).collect(),
            Utc.with_ymd_and_hms(2026, 8, day, 10, 0, 0).unwrap(),
        )
        .expect("aligned batch")
    }

    #[tokio::test]
    async fn batches_are_append_only_and_latest_wins() {
        let pool = setup_pool().await;
        let repo = SqlRecommendationRepository::new(pool.clone());

        repo.append(&batch("rec-1", "cust-1", 1, &["prod-1", "prod-2"])).await.expect("append");
        repo.append(&batch("rec-2", "cust-1", 5, &["prod-3"])).await.expect("append");
        repo.append(&batch("rec-3", "cust-2", 3, &["prod-1"])).await.expect("append");

        let latest = repo.latest_per_customer().await.expect("latest");
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].id, RecommendationId("rec-2".to_string()));
        assert_eq!(latest[0].product_ids, vec![ProductId("prod-3".to_string())]);
        assert_eq!(latest[1].id, RecommendationId("rec-3".to_string()));

        pool.close().await;
    }

    #[tokio::test]
    async fn batch_round_trips_with_scores_aligned() {
        let pool = setup_pool().await;
        let repo = SqlRecommendationRepository::new(pool.clone());

        let stored = batch("rec-9", "cust-7", 2, &["prod-1", "prod-2", "prod-3"]);
        repo.append(&stored).await.expect("append");

        let latest = repo.latest_per_customer().await.expect("latest");
        assert_eq!(latest, vec![stored]);

        pool.close().await;
    }
}
