use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const SEED_CUSTOMER_IDS: &[&str] =
    &["cust-ada", "cust-ben", "cust-cho", "cust-dev", "cust-eva", "cust-fin"];

const SEED_PRODUCT_IDS: &[&str] = &[
    "prod-mat",
    "prod-buds",
    "prod-novel",
    "prod-press",
    "prod-shoes",
    "prod-candle",
    "prod-stand",
    "prod-beans",
];

const SEED_EVENT_COUNT: i64 = 18;

/// Customers with purchase histories in the seed, in id order. Everyone else
/// is a browser or a cold start.
const SEED_PURCHASER_IDS: &[&str] = &["cust-ada", "cust-ben", "cust-cho", "cust-dev"];

/// Deterministic demo storefront used by the `seed` command and the pipeline
/// tests: four purchasers with distinct recency/frequency/spend profiles, one
/// browser without purchases, and one cold-start customer with no events.
pub struct DemoDataset;

impl DemoDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed_data.sql");

    /// Load the demo dataset. Idempotent: rows are replaced by id.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult {
            customers: SEED_CUSTOMER_IDS.len(),
            products: SEED_PRODUCT_IDS.len(),
            events: SEED_EVENT_COUNT as usize,
        })
    }

    /// Verify the seeded rows against the dataset contract.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let quoted_customers = sql_array_from_ids(SEED_CUSTOMER_IDS);
        let customer_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM customers WHERE id IN {quoted_customers}"
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("customers", customer_count == SEED_CUSTOMER_IDS.len() as i64));

        let quoted_products = sql_array_from_ids(SEED_PRODUCT_IDS);
        let product_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM products WHERE id IN {quoted_products}"
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("products", product_count == SEED_PRODUCT_IDS.len() as i64));

        let event_count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM events").fetch_one(pool).await?;
        checks.push(("events", event_count == SEED_EVENT_COUNT));

        for purchaser in SEED_PURCHASER_IDS {
            let has_purchase: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM events WHERE customer_id = ?1 AND kind = 'purchase')",
            )
            .bind(purchaser)
            .fetch_one(pool)
            .await?;
            checks.push(("purchaser-history", has_purchase == 1));
        }

        let cold_start_events: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM events WHERE customer_id = 'cust-fin'")
                .fetch_one(pool)
                .await?;
        checks.push(("cold-start-has-no-events", cold_start_events == 0));

        let browser_purchases: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM events WHERE customer_id = 'cust-eva' AND kind = 'purchase'",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("browser-has-no-purchases", browser_purchases == 0));

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Remove the seeded rows from a test database.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let quoted_customers = sql_array_from_ids(SEED_CUSTOMER_IDS);
        let quoted_products = sql_array_from_ids(SEED_PRODUCT_IDS);

        sqlx::query(&format!("DELETE FROM events WHERE customer_id IN {quoted_customers}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!(
            "DELETE FROM product_embeddings WHERE product_id IN {quoted_products}"
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!("DELETE FROM segments WHERE customer_id IN {quoted_customers}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!(
            "DELETE FROM recommendations WHERE customer_id IN {quoted_customers}"
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!("DELETE FROM products WHERE id IN {quoted_products}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM customers WHERE id IN {quoted_customers}"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

fn sql_array_from_ids(ids: &[&str]) -> String {
    let quoted = ids.iter().map(|id| format!("'{}'", id)).collect::<Vec<_>>().join(",");
    format!("({quoted})")
}

#[derive(Debug)]
pub struct SeedResult {
    pub customers: usize,
    pub products: usize,
    pub events: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
