use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use shopsight_core::domain::customer::{Customer, CustomerId};
use shopsight_core::domain::event::{Event, EventId, EventKind};
use shopsight_core::domain::product::{Product, ProductId};
use shopsight_db::repositories::{CustomerRepository, EventRepository, ProductRepository};

use crate::{StageError, StageReport};

#[derive(Debug, Deserialize)]
struct CustomerRecord {
    customer_id: String,
    age: Option<u32>,
    gender: Option<String>,
    location: Option<String>,
    interests: Option<String>,
    registered_at: Option<String>,
    last_active_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProductRecord {
    product_id: String,
    name: String,
    description: Option<String>,
    price: f64,
    category: Option<String>,
    popularity: Option<i64>,
    stock: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct EventRecord {
    event_id: Option<String>,
    customer_id: String,
    product_id: String,
    event_type: String,
    timestamp: String,
    dwell_time: Option<u32>,
}

/// Upserts customer profiles from a CSV export. Rows with an empty id or an
/// unreadable timestamp are skipped with a warning.
pub async fn ingest_customers(
    repo: &dyn CustomerRepository,
    path: &Path,
) -> Result<StageReport, StageError> {
    let mut reader = open_reader(path)?;
    let mut processed = 0usize;
    let mut skipped = 0usize;

    for (line, record) in reader.deserialize::<CustomerRecord>().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(error) => {
                warn!(line = line + 2, %error, "skipping malformed customer row");
                skipped += 1;
                continue;
            }
        };

        let Some(customer) = customer_from_record(record, line + 2) else {
            skipped += 1;
            continue;
        };
        repo.upsert(&customer).await?;
        processed += 1;
    }

    Ok(StageReport::new(
        "ingest-customers",
        processed,
        skipped,
        format!("upserted {processed} customers, skipped {skipped} rows"),
    ))
}

/// Replaces the product catalog from a CSV export in one transaction. Rows
/// that fail to parse or carry a negative price are skipped with a warning.
pub async fn ingest_products(
    repo: &dyn ProductRepository,
    path: &Path,
) -> Result<StageReport, StageError> {
    let mut reader = open_reader(path)?;
    let mut products = Vec::new();
    let mut skipped = 0usize;

    for (line, record) in reader.deserialize::<ProductRecord>().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(error) => {
                warn!(line = line + 2, %error, "skipping malformed product row");
                skipped += 1;
                continue;
            }
        };

        if record.product_id.trim().is_empty() {
            warn!(line = line + 2, "skipping product row without an id");
            skipped += 1;
            continue;
        }
        if !record.price.is_finite() || record.price < 0.0 {
            warn!(
                line = line + 2,
                product_id = %record.product_id,
                price = record.price,
                "skipping product row with invalid price"
            );
            skipped += 1;
            continue;
        }

        products.push(Product {
            id: ProductId(record.product_id.trim().to_string()),
            name: record.name,
            description: record.description.unwrap_or_default(),
            price: record.price,
            category: record.category.unwrap_or_default(),
            popularity: record.popularity.unwrap_or(0),
            stock: record.stock.unwrap_or(0).max(0),
        });
    }

    let processed = products.len();
    repo.replace_all(&products).await?;

    Ok(StageReport::new(
        "ingest-products",
        processed,
        skipped,
        format!("replaced catalog with {processed} products, skipped {skipped} rows"),
    ))
}

/// Appends interaction events from a CSV export. Unknown event kinds and
/// unreadable timestamps are skipped with a warning; rows without an event id
/// get a generated one.
pub async fn ingest_events(
    repo: &dyn EventRepository,
    path: &Path,
) -> Result<StageReport, StageError> {
    let mut reader = open_reader(path)?;
    let mut processed = 0usize;
    let mut skipped = 0usize;

    for (line, record) in reader.deserialize::<EventRecord>().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(error) => {
                warn!(line = line + 2, %error, "skipping malformed event row");
                skipped += 1;
                continue;
            }
        };

        let Some(kind) = EventKind::parse(&record.event_type) else {
            warn!(line = line + 2, event_type = %record.event_type, "skipping unknown event kind");
            skipped += 1;
            continue;
        };
        let Some(occurred_at) = parse_rfc3339(&record.timestamp) else {
            warn!(line = line + 2, timestamp = %record.timestamp, "skipping unreadable event timestamp");
            skipped += 1;
            continue;
        };

        let id = record
            .event_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("evt-{}", Uuid::new_v4()));

        repo.append(&Event {
            id: EventId(id),
            customer_id: CustomerId(record.customer_id),
            product_id: ProductId(record.product_id),
            kind,
            occurred_at,
            dwell_time_secs: record.dwell_time,
        })
        .await?;
        processed += 1;
    }

    Ok(StageReport::new(
        "ingest-events",
        processed,
        skipped,
        format!("appended {processed} events, skipped {skipped} rows"),
    ))
}

fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>, StageError> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| StageError::InputParse { path: path.to_path_buf(), source })
}

fn customer_from_record(record: CustomerRecord, line: usize) -> Option<Customer> {
    if record.customer_id.trim().is_empty() {
        warn!(line, "skipping customer row without an id");
        return None;
    }

    let registered_at = match record.registered_at {
        Some(raw) => match parse_rfc3339(&raw) {
            Some(ts) => ts,
            None => {
                warn!(line, timestamp = %raw, "skipping customer row with unreadable registered_at");
                return None;
            }
        },
        None => Utc::now(),
    };
    let last_active_at = record.last_active_at.as_deref().and_then(parse_rfc3339);

    let interests = record
        .interests
        .as_deref()
        .map(split_interests)
        .unwrap_or_default();

    Some(Customer {
        id: CustomerId(record.customer_id.trim().to_string()),
        age: record.age,
        gender: record.gender.filter(|value| !value.trim().is_empty()),
        location: record.location.filter(|value| !value.trim().is_empty()),
        interests,
        registered_at,
        last_active_at,
    })
}

fn split_interests(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(|interest| interest.trim().to_string())
        .filter(|interest| !interest.is_empty())
        .collect()
}

fn parse_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim()).ok().map(|ts| ts.with_timezone(&Utc))
}
