use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shopsight_core::domain::product::ProductId;
use sqlx::Row;

use super::{EmbeddingRepository, RepositoryError};
use crate::DbPool;

pub struct SqlEmbeddingRepository {
    pool: DbPool,
}

impl SqlEmbeddingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmbeddingRepository for SqlEmbeddingRepository {
    async fn replace_all(
        &self,
        embeddings: &[(ProductId, Vec<f64>)],
        generated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM product_embeddings").execute(&mut *tx).await?;
        for (product_id, vector) in embeddings {
            let vector_json = serde_json::to_string(vector)
                .map_err(|e| RepositoryError::Decode(format!("could not encode vector: {e}")))?;

            sqlx::query(
                r#"
                INSERT INTO product_embeddings (product_id, vector_json, generated_at)
                VALUES (?, ?, ?)
                "#,
            )
            .bind(&product_id.0)
            .bind(vector_json)
            .bind(generated_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn load_all(&self) -> Result<HashMap<ProductId, Vec<f64>>, RepositoryError> {
        let rows = sqlx::query("SELECT product_id, vector_json FROM product_embeddings")
            .fetch_all(&self.pool)
            .await?;

        let mut embeddings = HashMap::with_capacity(rows.len());
        for row in rows {
            let product_id: String = row.try_get("product_id")?;
            let vector_json: String = row.try_get("vector_json")?;
            let vector: Vec<f64> = serde_json::from_str(&vector_json)
                .map_err(|e| RepositoryError::Decode(format!("invalid vector_json: {e}")))?;
            embeddings.insert(ProductId(product_id), vector);
        }

        Ok(embeddings)
    }
}
