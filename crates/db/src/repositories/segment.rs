use async_trait::async_trait;
use shopsight_core::domain::customer::CustomerId;
use shopsight_core::domain::segment::SegmentAssignment;
use sqlx::{sqlite::SqliteRow, Row};

use super::{parse_timestamp, RepositoryError, SegmentRepository};
use crate::DbPool;

pub struct SqlSegmentRepository {
    pool: DbPool,
}

impl SqlSegmentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SegmentRepository for SqlSegmentRepository {
    async fn replace_all(&self, assignments: &[SegmentAssignment]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM segments").execute(&mut *tx).await?;
        for assignment in assignments {
            sqlx::query(
                r#"
                INSERT INTO segments (customer_id, label, score, assigned_at)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(&assignment.customer_id.0)
            .bind(&assignment.label)
            .bind(assignment.score)
            .bind(assignment.assigned_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: &CustomerId) -> Result<Option<SegmentAssignment>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT customer_id, label, score, assigned_at
            FROM segments
            WHERE customer_id = ?
            "#,
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| assignment_from_row(&r)).transpose()
    }

    async fn list(&self) -> Result<Vec<SegmentAssignment>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT customer_id, label, score, assigned_at
            FROM segments
            ORDER BY customer_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(assignment_from_row).collect()
    }
}

fn assignment_from_row(row: &SqliteRow) -> Result<SegmentAssignment, RepositoryError> {
    let customer_id: String = row.try_get("customer_id")?;
    let assigned_at: String = row.try_get("assigned_at")?;

    Ok(SegmentAssignment {
        customer_id: CustomerId(customer_id),
        label: row.try_get("label")?,
        score: row.try_get("score")?,
        assigned_at: parse_timestamp("assigned_at", assigned_at)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use shopsight_core::domain::customer::CustomerId;
    use shopsight_core::domain::segment::SegmentAssignment;

    use super::{SegmentRepository, SqlSegmentRepository};
    use crate::{connect_with_settings, migrations};

    async fn setup_pool() -> crate::DbPool {
        let pool =
            connect_with_settings("sqlite::memory:?cache=shared", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    fn assignment(customer: &str, label: &str, score: f64) -> SegmentAssignment {
        SegmentAssignment {
            customer_id: CustomerId(customer.to_string()),
            label: label.to_string(),
            score,
            assigned_at: Utc.with_ymd_and_hms(2026, 8, 1, 6, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn replace_all_swaps_every_assignment() {
        let pool = setup_pool().await;
        let repo = SqlSegmentRepository::new(pool.clone());

        repo.replace_all(&[assignment("cust-1", "loyal", 0.8), assignment("cust-2", "at_risk", 0.1)])
            .await
            .expect("first run");
        repo.replace_all(&[assignment("cust-1", "champion", 0.95)]).await.expect("second run");

        let listed = repo.list().await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].label, "champion");

        let missing = repo.get(&CustomerId("cust-2".to_string())).await.expect("get");
        assert_eq!(missing, None);

        pool.close().await;
    }

    #[tokio::test]
    async fn assignment_round_trips() {
        let pool = setup_pool().await;
        let repo = SqlSegmentRepository::new(pool.clone());

        let stored = assignment("cust-9", "occasional", 0.42);
        repo.replace_all(std::slice::from_ref(&stored)).await.expect("store");

        let fetched = repo.get(&stored.customer_id).await.expect("get");
        assert_eq!(fetched, Some(stored));

        pool.close().await;
    }
}
