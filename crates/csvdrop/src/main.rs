//! csvdrop - Main entry point

use clap::Parser;
use csvdrop::config::Config;
use csvdrop::db::Database;
use csvdrop::{BatchOrchestrator, Cli, IntakeError, PgBulkLoader};
use csvdrop_common::logging::{init_logging, LogConfig, LogLevel};
use std::process::ExitCode;
use tracing::{error, info};

/// Missing/invalid folder or configuration; nothing was touched (`-1` as a byte)
const EXIT_PRECONDITION: u8 = 255;

/// The batch stopped part-way: archive, listing or database failure
const EXIT_FATAL: u8 = 1;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command-line arguments (clap exits with 2 on usage errors)
    let cli = Cli::parse();

    dotenvy::dotenv().ok();

    let base = LogConfig::builder()
        .level(if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        })
        .log_file_prefix("csvdrop")
        .build();

    // Environment variables take precedence over the flag-derived defaults
    let log_config = match LogConfig::from_env(base) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_PRECONDITION);
        },
    };

    let _log_guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: failed to initialise logging: {}", e);
            return ExitCode::from(EXIT_PRECONDITION);
        },
    };

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Batch failed");
            eprintln!("Error: {}", e);
            if e.is_startup() {
                ExitCode::from(EXIT_PRECONDITION)
            } else {
                ExitCode::from(EXIT_FATAL)
            }
        },
    }
}

async fn run(cli: &Cli) -> Result<(), IntakeError> {
    // A missing folder is reported ahead of any configuration problem
    BatchOrchestrator::check_folder(&cli.folder)?;

    let mut config = Config::from_env()?;
    if let Some(ref table) = cli.table {
        config.intake.table = table.clone();
    }
    if let Some(max_in_flight) = cli.max_in_flight {
        config.intake.max_in_flight = max_in_flight;
    }
    config.validate()?;

    let orchestrator = BatchOrchestrator::new(&cli.folder, config.intake.max_in_flight)?;

    // The database is only contacted when there is work to do
    let batch = orchestrator.discover()?;
    if batch.is_empty() {
        info!(folder = %orchestrator.folder().display(), "No files to consume");
        return Ok(());
    }

    let db = Database::connect(&config.database).await?;
    let loader = PgBulkLoader::new(&db, &config.intake.table);

    let result = orchestrator.process(batch, &loader).await;

    drop(loader);
    db.close().await;

    result.map(|_| ())
}
