use shopsight_core::config::LoadOptions;
use shopsight_db::DemoDataset;

use crate::commands::{self, CommandResult};

pub fn run() -> CommandResult {
    commands::execute("seed", LoadOptions::default(), |_config, pool| async move {
        let seeded = DemoDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 6u8))?;

        let verification = DemoDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        if !verification.all_present {
            return Err(("seed_verification", verification_message(&verification.checks), 6u8));
        }

        Ok(format!(
            "demo storefront loaded: {} customers, {} products, {} events",
            seeded.customers, seeded.products, seeded.events
        ))
    })
}

fn verification_message(checks: &[(&'static str, bool)]) -> String {
    let failed = checks
        .iter()
        .filter_map(|(check, passed)| (!passed).then_some(*check))
        .collect::<Vec<_>>();
    if failed.is_empty() {
        "some seed rows failed to load".to_string()
    } else {
        format!("seed verification failed for checks: {}", failed.join(", "))
    }
}
