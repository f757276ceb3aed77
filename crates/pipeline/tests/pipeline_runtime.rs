use std::collections::HashSet;
use std::io::Write;

use shopsight_core::config::{RecommendationConfig, SegmentationConfig};
use shopsight_core::domain::customer::CustomerId;
use shopsight_core::domain::report::MetricsReport;
use shopsight_core::segmentation::RfmWeights;
use shopsight_db::repositories::{
    CustomerRepository, EventRepository, ProductRepository, RecommendationRepository,
    ReportRepository, SegmentRepository, SqlCustomerRepository, SqlEmbeddingRepository,
    SqlEventRepository, SqlProductRepository, SqlRecommendationRepository, SqlReportRepository,
    SqlSegmentRepository,
};
use shopsight_db::{connect_with_settings, migrations, DbPool, DemoDataset};
use shopsight_embed::HashEmbedder;
use shopsight_pipeline::{embeddings, ingest, metrics, recommend, segmentation};

async fn setup_pool() -> DbPool {
    let pool =
        connect_with_settings("sqlite::memory:?cache=shared", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("run migrations");
    pool
}

fn segmentation_config() -> SegmentationConfig {
    SegmentationConfig {
        clusters: 4,
        seed: 42,
        max_iterations: 100,
        weights: RfmWeights::default(),
        labels: vec![
            "at_risk".to_string(),
            "occasional".to_string(),
            "loyal".to_string(),
            "champion".to_string(),
        ],
    }
}

fn recommendation_config() -> RecommendationConfig {
    RecommendationConfig {
        top_n: 5,
        click_weight: 1.0,
        cart_weight: 2.0,
        purchase_weight: 3.0,
        segment_boost: 1.2,
        fallback_confidence: 0.5,
    }
}

#[tokio::test]
async fn full_pipeline_over_seeded_storefront() {
    let pool = setup_pool().await;
    DemoDataset::load(&pool).await.expect("seed");

    let customers = SqlCustomerRepository::new(pool.clone());
    let products = SqlProductRepository::new(pool.clone());
    let vectors = SqlEmbeddingRepository::new(pool.clone());
    let events = SqlEventRepository::new(pool.clone());
    let segments = SqlSegmentRepository::new(pool.clone());
    let recommendations = SqlRecommendationRepository::new(pool.clone());
    let reports = SqlReportRepository::new(pool.clone());
    let embedder = HashEmbedder::new(32);

    let embed_report =
        embeddings::run(&products, &vectors, &embedder).await.expect("embed stage");
    assert_eq!(embed_report.processed, 8);
    assert_eq!(embed_report.skipped, 0);

    let segment_report =
        segmentation::run(&events, &segments, &segmentation_config()).await.expect("segment stage");
    // Only the four purchasers receive a segment.
    assert_eq!(segment_report.processed, 4);
    let assignments = segments.list().await.expect("list segments");
    assert_eq!(assignments.len(), 4);
    let labelled: HashSet<_> = assignments.iter().map(|a| a.customer_id.0.as_str()).collect();
    assert!(labelled.contains("cust-ada"));
    assert!(!labelled.contains("cust-eva"));
    assert!(!labelled.contains("cust-fin"));

    let recommend_report = recommend::run(
        &customers,
        &events,
        &products,
        &vectors,
        &segments,
        &recommendations,
        &recommendation_config(),
    )
    .await
    .expect("recommend stage");
    assert_eq!(recommend_report.processed, 6, "every customer should get a batch");

    let batches = recommendations.latest_per_customer().await.expect("latest batches");
    assert_eq!(batches.len(), 6);
    for batch in &batches {
        assert_eq!(batch.product_ids.len(), batch.scores.len());
        assert!(batch.product_ids.len() <= 5);
        assert!(!batch.product_ids.is_empty());

        let interacted: HashSet<_> = events
            .history_counts(&batch.customer_id)
            .await
            .expect("history")
            .into_iter()
            .map(|(product_id, _, _)| product_id)
            .collect();
        for product_id in &batch.product_ids {
            assert!(
                !interacted.contains(product_id),
                "{} was recommended {} despite prior interaction",
                batch.customer_id.0,
                product_id.0
            );
        }
    }

    // The cold-start customer gets fixed-confidence fallback picks.
    let cold_start = batches
        .iter()
        .find(|batch| batch.customer_id == CustomerId("cust-fin".to_string()))
        .expect("cold-start batch");
    assert!(cold_start.scores.iter().all(|score| *score == 0.5));

    metrics::run(&events, &products, &segments, &recommendations, &reports)
        .await
        .expect("report stage");
    let report = reports
        .latest(MetricsReport::KIND)
        .await
        .expect("load report")
        .expect("report exists");
    assert_eq!(report.overall.recommended_customers, 6);
    assert!((0.0..=1.0).contains(&report.overall.ctr));
    assert!((0.0..=1.0).contains(&report.overall.cart_rate));
    assert!((0.0..=1.0).contains(&report.overall.conversion_rate));
    assert!(report.overall.aov > 0.0, "seed data contains purchases");
    assert!(!report.segments.is_empty());

    pool.close().await;
}

#[tokio::test]
async fn pipeline_is_deterministic_for_a_fixed_seed() {
    let mut fingerprints = Vec::new();

    for _ in 0..2 {
        let pool = setup_pool().await;
        DemoDataset::load(&pool).await.expect("seed");

        let events = SqlEventRepository::new(pool.clone());
        let segments = SqlSegmentRepository::new(pool.clone());
        segmentation::run(&events, &segments, &segmentation_config())
            .await
            .expect("segment stage");

        let mut assignments = segments.list().await.expect("list");
        assignments.sort_by(|a, b| a.customer_id.0.cmp(&b.customer_id.0));
        fingerprints.push(
            assignments
                .into_iter()
                .map(|a| (a.customer_id.0, a.label))
                .collect::<Vec<_>>(),
        );

        pool.close().await;
    }

    assert_eq!(fingerprints[0], fingerprints[1]);
}

#[tokio::test]
async fn segmentation_without_purchases_keeps_prior_assignments() {
    let pool = setup_pool().await;

    let segments = SqlSegmentRepository::new(pool.clone());
    let events = SqlEventRepository::new(pool.clone());
    segments
        .replace_all(&[shopsight_core::SegmentAssignment {
            customer_id: CustomerId("cust-old".to_string()),
            label: "loyal".to_string(),
            score: 0.7,
            assigned_at: chrono::Utc::now(),
        }])
        .await
        .expect("seed assignment");

    let report =
        segmentation::run(&events, &segments, &segmentation_config()).await.expect("stage");
    assert_eq!(report.processed, 0);

    let remaining = segments.list().await.expect("list");
    assert_eq!(remaining.len(), 1, "prior assignments must survive an empty run");

    pool.close().await;
}

#[tokio::test]
async fn ingest_skips_bad_rows_and_loads_good_ones() {
    let pool = setup_pool().await;
    let customers = SqlCustomerRepository::new(pool.clone());
    let products = SqlProductRepository::new(pool.clone());
    let events = SqlEventRepository::new(pool.clone());

    let dir = tempfile::tempdir().expect("tempdir");

    let customers_path = dir.path().join("customers.csv");
    let mut file = std::fs::File::create(&customers_path).expect("create csv");
    writeln!(
        file,
        "customer_id,age,gender,location,interests,registered_at,last_active_at\n\
         cust-1,29,female,Lisbon,yoga;reading,2026-01-10T08:00:00+00:00,\n\
         ,31,male,Porto,tech,2026-01-11T08:00:00+00:00,\n\
         cust-2,40,,,,not-a-date,"
    )
    .expect("write csv");
    let report = ingest::ingest_customers(&customers, &customers_path).await.expect("ingest");
    assert_eq!(report.processed, 1);
    assert_eq!(report.skipped, 2);
    let loaded = customers.list().await.expect("list");
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].interests, vec!["yoga".to_string(), "reading".to_string()]);

    let products_path = dir.path().join("products.csv");
    let mut file = std::fs::File::create(&products_path).expect("create csv");
    writeln!(
        file,
        "product_id,name,description,price,category,popularity,stock\n\
         prod-1,Yoga Mat,Non-slip mat,39.99,Sports & Fitness,80,50\n\
         prod-2,Broken,Bad price,-5.0,Lifestyle,10,5\n\
         prod-3,Earbuds,Wireless earbuds,129.0,Electronics,95,20"
    )
    .expect("write csv");
    let report = ingest::ingest_products(&products, &products_path).await.expect("ingest");
    assert_eq!(report.processed, 2);
    assert_eq!(report.skipped, 1);

    let events_path = dir.path().join("events.csv");
    let mut file = std::fs::File::create(&events_path).expect("create csv");
    writeln!(
        file,
        "event_id,customer_id,product_id,event_type,timestamp,dwell_time\n\
         evt-1,cust-1,prod-1,click,2026-02-01T10:00:00+00:00,30\n\
         evt-2,cust-1,prod-1,teleport,2026-02-01T10:05:00+00:00,\n\
         ,cust-1,prod-3,purchase,2026-02-02T09:00:00+00:00,"
    )
    .expect("write csv");
    let report = ingest::ingest_events(&events, &events_path).await.expect("ingest");
    assert_eq!(report.processed, 2);
    assert_eq!(report.skipped, 1);

    let stored = events.list_all().await.expect("list");
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|event| !event.id.0.is_empty()));

    pool.close().await;
}
