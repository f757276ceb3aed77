pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "shopsight",
    about = "Shopsight analytics pipeline CLI",
    long_about = "Operate the Shopsight pipeline: ingest storefront CSV exports, embed the catalog, segment customers, generate recommendations, and report funnel metrics.",
    after_help = "Examples:\n  shopsight migrate\n  shopsight ingest-events --input data/events.csv\n  shopsight recommend --top-n 10\n  shopsight doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo storefront dataset")]
    Seed,
    #[command(about = "Ingest a customers CSV export, skipping malformed rows")]
    IngestCustomers {
        #[arg(long, help = "Path to the customers CSV file")]
        input: PathBuf,
    },
    #[command(about = "Ingest a product catalog CSV export, replacing the stored catalog")]
    IngestProducts {
        #[arg(long, help = "Path to the products CSV file")]
        input: PathBuf,
    },
    #[command(about = "Ingest an interaction events CSV export, skipping malformed rows")]
    IngestEvents {
        #[arg(long, help = "Path to the events CSV file")]
        input: PathBuf,
    },
    #[command(about = "Embed the product catalog with the configured provider")]
    Embed,
    #[command(about = "Assign purchasing customers to labelled RFM segments")]
    Segment,
    #[command(about = "Generate a recommendation batch for every customer")]
    Recommend {
        #[arg(long, help = "Override the number of products per batch")]
        top_n: Option<usize>,
    },
    #[command(about = "Compute funnel and per-segment metrics and append a report")]
    Report,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, embedding provider readiness, and DB connectivity checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::IngestCustomers { input } => commands::ingest::customers(&input),
        Command::IngestProducts { input } => commands::ingest::products(&input),
        Command::IngestEvents { input } => commands::ingest::events(&input),
        Command::Embed => commands::embed::run(),
        Command::Segment => commands::segment::run(),
        Command::Recommend { top_n } => commands::recommend::run(top_n),
        Command::Report => commands::report::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
