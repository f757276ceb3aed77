use async_trait::async_trait;
use shopsight_core::domain::customer::{Customer, CustomerId};
use sqlx::{sqlite::SqliteRow, Row};

use super::{parse_timestamp, CustomerRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCustomerRepository {
    pool: DbPool,
}

impl SqlCustomerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerRepository for SqlCustomerRepository {
    async fn upsert(&self, customer: &Customer) -> Result<(), RepositoryError> {
        let interests_json = serde_json::to_string(&customer.interests)
            .map_err(|e| RepositoryError::Decode(format!("could not encode interests: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, age, gender, location, interests_json, registered_at, last_active_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                age = excluded.age,
                gender = excluded.gender,
                location = excluded.location,
                interests_json = excluded.interests_json,
                registered_at = excluded.registered_at,
                last_active_at = excluded.last_active_at
            "#,
        )
        .bind(&customer.id.0)
        .bind(customer.age)
        .bind(&customer.gender)
        .bind(&customer.location)
        .bind(interests_json)
        .bind(customer.registered_at.to_rfc3339())
        .bind(customer.last_active_at.map(|ts| ts.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, age, gender, location, interests_json, registered_at, last_active_at
            FROM customers
            WHERE id = ?
            "#,
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| customer_from_row(&r)).transpose()
    }

    async fn list(&self) -> Result<Vec<Customer>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, age, gender, location, interests_json, registered_at, last_active_at
            FROM customers
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(customer_from_row).collect()
    }
}

fn customer_from_row(row: &SqliteRow) -> Result<Customer, RepositoryError> {
    let id: String = row.try_get("id")?;
    let interests_json: String = row.try_get("interests_json")?;
    let registered_at: String = row.try_get("registered_at")?;
    let last_active_at: Option<String> = row.try_get("last_active_at")?;

    let interests: Vec<String> = serde_json::from_str(&interests_json)
        .map_err(|e| RepositoryError::Decode(format!("invalid interests_json: {e}")))?;

    Ok(Customer {
        id: CustomerId(id),
        age: row.try_get("age")?,
        gender: row.try_get("gender")?,
        location: row.try_get("location")?,
        interests,
        registered_at: parse_timestamp("registered_at", registered_at)?,
        last_active_at: last_active_at
            .map(|ts| parse_timestamp("last_active_at", ts))
            .transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use shopsight_core::domain::customer::{Customer, CustomerId};

    use super::{CustomerRepository, SqlCustomerRepository};
    use crate::{connect_with_settings, migrations};

    async fn setup_pool() -> crate::DbPool {
        let pool =
            connect_with_settings("sqlite::memory:?cache=shared", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    fn sample(id: &str) -> Customer {
        Customer {
            id: CustomerId(id.to_string()),
            age: Some(34),
            gender: Some("female".to_string()),
            location: Some("Lisbon".to_string()),
            interests: vec!["yoga".to_string(), "reading".to_string()],
            registered_at: Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap(),
            last_active_at: Some(Utc.with_ymd_and_hms(2026, 8, 1, 18, 30, 0).unwrap()),
        }
    }

    #[tokio::test]
    async fn customer_round_trip_preserves_interests() {
        let pool = setup_pool().await;
        let repo = SqlCustomerRepository::new(pool.clone());

        let customer = sample("cust-1");
        repo.upsert(&customer).await.expect("upsert");

        let fetched = repo.get(&customer.id).await.expect("get");
        assert_eq!(fetched, Some(customer));

        pool.close().await;
    }

    #[tokio::test]
    async fn upsert_replaces_existing_row() {
        let pool = setup_pool().await;
        let repo = SqlCustomerRepository::new(pool.clone());

        let mut customer = sample("cust-2");
        repo.upsert(&customer).await.expect("first upsert");

        customer.location = Some("Porto".to_string());
        customer.interests = vec!["cycling".to_string()];
        repo.upsert(&customer).await.expect("second upsert");

        let listed = repo.list().await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].location.as_deref(), Some("Porto"));
        assert_eq!(listed[0].interests, vec!["cycling".to_string()]);

        pool.close().await;
    }
}
