use async_trait::async_trait;
use shopsight_core::domain::product::{Product, ProductId};
use sqlx::{sqlite::SqliteRow, Row};

use super::{ProductRepository, RepositoryError};
use crate::DbPool;

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductRepository for SqlProductRepository {
    async fn replace_all(&self, products: &[Product]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM products").execute(&mut *tx).await?;
        for product in products {
            sqlx::query(
                r#"
                INSERT INTO products (id, name, description, price, category, popularity, stock)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&product.id.0)
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.price)
            .bind(&product.category)
            .bind(product.popularity)
            .bind(product.stock)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, price, category, popularity, stock
            FROM products
            WHERE id = ?
            "#,
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| product_from_row(&r)).transpose()
    }

    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, description, price, category, popularity, stock
            FROM products
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(product_from_row).collect()
    }

    async fn list_by_popularity(&self) -> Result<Vec<ProductId>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id
            FROM products
            ORDER BY popularity DESC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Ok(ProductId(row.try_get::<String, _>("id")?)))
            .collect()
    }
}

fn product_from_row(row: &SqliteRow) -> Result<Product, RepositoryError> {
    let id: String = row.try_get("id")?;

    Ok(Product {
        id: ProductId(id),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: row.try_get("price")?,
        category: row.try_get("category")?,
        popularity: row.try_get("popularity")?,
        stock: row.try_get("stock")?,
    })
}
