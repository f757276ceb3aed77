use std::path::Path;

use shopsight_core::config::LoadOptions;
use shopsight_db::repositories::{
    SqlCustomerRepository, SqlEventRepository, SqlProductRepository,
};
use shopsight_pipeline::ingest;

use crate::commands::{self, CommandResult};

pub fn customers(input: &Path) -> CommandResult {
    let input = input.to_path_buf();
    commands::execute("ingest-customers", LoadOptions::default(), move |_config, pool| async move {
        let repo = SqlCustomerRepository::new(pool);
        let report = ingest::ingest_customers(&repo, &input)
            .await
            .map_err(|error| ("stage", error.to_string(), 6u8))?;
        Ok(report.summary)
    })
}

pub fn products(input: &Path) -> CommandResult {
    let input = input.to_path_buf();
    commands::execute("ingest-products", LoadOptions::default(), move |_config, pool| async move {
        let repo = SqlProductRepository::new(pool);
        let report = ingest::ingest_products(&repo, &input)
            .await
            .map_err(|error| ("stage", error.to_string(), 6u8))?;
        Ok(report.summary)
    })
}

pub fn events(input: &Path) -> CommandResult {
    let input = input.to_path_buf();
    commands::execute("ingest-events", LoadOptions::default(), move |_config, pool| async move {
        let repo = SqlEventRepository::new(pool);
        let report = ingest::ingest_events(&repo, &input)
            .await
            .map_err(|error| ("stage", error.to_string(), 6u8))?;
        Ok(report.summary)
    })
}
