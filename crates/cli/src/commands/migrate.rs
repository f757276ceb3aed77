use shopsight_core::config::LoadOptions;

use crate::commands::{self, CommandResult};

pub fn run() -> CommandResult {
    commands::execute("migrate", LoadOptions::default(), |_config, _pool| async {
        Ok("applied pending migrations".to_string())
    })
}
