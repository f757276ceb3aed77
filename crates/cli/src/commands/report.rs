use shopsight_core::config::LoadOptions;
use shopsight_db::repositories::{
    SqlEventRepository, SqlProductRepository, SqlRecommendationRepository, SqlReportRepository,
    SqlSegmentRepository,
};
use shopsight_pipeline::metrics;

use crate::commands::{self, CommandResult};

pub fn run() -> CommandResult {
    commands::execute("report", LoadOptions::default(), |_config, pool| async move {
        let events = SqlEventRepository::new(pool.clone());
        let products = SqlProductRepository::new(pool.clone());
        let segments = SqlSegmentRepository::new(pool.clone());
        let recommendations = SqlRecommendationRepository::new(pool.clone());
        let reports = SqlReportRepository::new(pool);
        let report = metrics::run(&events, &products, &segments, &recommendations, &reports)
            .await
            .map_err(|error| ("stage", error.to_string(), 6u8))?;
        Ok(report.summary)
    })
}
