use shopsight_core::config::LoadOptions;
use shopsight_db::repositories::{SqlEventRepository, SqlSegmentRepository};
use shopsight_pipeline::segmentation;

use crate::commands::{self, CommandResult};

pub fn run() -> CommandResult {
    commands::execute("segment", LoadOptions::default(), |config, pool| async move {
        let events = SqlEventRepository::new(pool.clone());
        let segments = SqlSegmentRepository::new(pool);
        let report = segmentation::run(&events, &segments, &config.segmentation)
            .await
            .map_err(|error| ("stage", error.to_string(), 6u8))?;
        Ok(report.summary)
    })
}
