use async_trait::async_trait;
use shopsight_core::domain::report::MetricsReport;
use sqlx::Row;

use super::{ReportRepository, RepositoryError};
use crate::DbPool;

pub struct SqlReportRepository {
    pool: DbPool,
}

impl SqlReportRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportRepository for SqlReportRepository {
    async fn append(&self, report: &MetricsReport) -> Result<(), RepositoryError> {
        let id = format!("rep-{}", sqlx::types::Uuid::new_v4());
        let payload_json = serde_json::to_string(report)
            .map_err(|e| RepositoryError::Decode(format!("could not encode report: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO reports (id, kind, payload_json, generated_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(MetricsReport::KIND)
        .bind(payload_json)
        .bind(report.generated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn latest(&self, kind: &str) -> Result<Option<MetricsReport>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT payload_json
            FROM reports
            WHERE kind = ?
            ORDER BY generated_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(kind)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            let payload_json: String = r.try_get("payload_json")?;
            serde_json::from_str(&payload_json)
                .map_err(|e| RepositoryError::Decode(format!("invalid payload_json: {e}")))
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use shopsight_core::domain::report::{FunnelMetrics, MetricsReport, SegmentMetrics};

    use super::{ReportRepository, SqlReportRepository};
    use crate::{connect_with_settings, migrations};

    async fn setup_pool() -> crate::DbPool {
        let pool =
            connect_with_settings("sqlite::memory:?cache=shared", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    fn report(day: u32, ctr: f64) -> MetricsReport {
        MetricsReport {
            overall: FunnelMetrics {
                recommended_customers: 10,
                clicked_customers: 4,
                cart_customers: 2,
                purchased_customers: 1,
                ctr,
                cart_rate: 0.5,
                conversion_rate: 0.5,
                aov: 55.0,
            },
            segments: vec![SegmentMetrics {
                label: "loyal".to_string(),
                active_customers: 3,
                purchasing_customers: 1,
                avg_purchase_value: 40.0,
            }],
            generated_at: Utc.with_ymd_and_hms(2026, 8, day, 8, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn reports_append_and_latest_round_trips() {
        let pool = setup_pool().await;
        let repo = SqlReportRepository::new(pool.clone());

        repo.append(&report(1, 0.3)).await.expect("append");
        repo.append(&report(9, 0.4)).await.expect("append");

        let latest = repo.latest(MetricsReport::KIND).await.expect("latest");
        assert_eq!(latest, Some(report(9, 0.4)));

        pool.close().await;
    }

    #[tokio::test]
    async fn latest_for_unknown_kind_is_none() {
        let pool = setup_pool().await;
        let repo = SqlReportRepository::new(pool.clone());

        let latest = repo.latest("nonexistent").await.expect("latest");
        assert_eq!(latest, None);

        pool.close().await;
    }
}
