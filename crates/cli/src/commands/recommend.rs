use shopsight_core::config::{ConfigOverrides, LoadOptions};
use shopsight_db::repositories::{
    SqlCustomerRepository, SqlEmbeddingRepository, SqlEventRepository, SqlProductRepository,
    SqlRecommendationRepository, SqlSegmentRepository,
};
use shopsight_pipeline::recommend;

use crate::commands::{self, CommandResult};

pub fn run(top_n: Option<usize>) -> CommandResult {
    let options = LoadOptions {
        overrides: ConfigOverrides { recommendation_top_n: top_n, ..ConfigOverrides::default() },
        ..LoadOptions::default()
    };

    commands::execute("recommend", options, |config, pool| async move {
        let customers = SqlCustomerRepository::new(pool.clone());
        let events = SqlEventRepository::new(pool.clone());
        let products = SqlProductRepository::new(pool.clone());
        let vectors = SqlEmbeddingRepository::new(pool.clone());
        let segments = SqlSegmentRepository::new(pool.clone());
        let recommendations = SqlRecommendationRepository::new(pool);
        let report = recommend::run(
            &customers,
            &events,
            &products,
            &vectors,
            &segments,
            &recommendations,
            &config.recommendation,
        )
        .await
        .map_err(|error| ("stage", error.to_string(), 6u8))?;
        Ok(report.summary)
    })
}
