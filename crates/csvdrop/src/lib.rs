//! csvdrop Library
//!
//! Scans a folder for dropped `.csv` files, bulk-loads each into a table, and
//! files it under `done/` or `error/` depending on the outcome. Meant to be
//! started by an external scheduler; each invocation is one pass.
//!
//! # Components
//!
//! - **FileLister** ([`lister`]): eligible files in the folder
//! - **StorageLoader** ([`loader`]): one file into the table via `COPY`
//! - **OutcomeArchiver** ([`archiver`]): `a.csv` -> `done/a.done.csv` or `error/a.error.csv`
//! - **BatchOrchestrator** ([`orchestrator`]): ties them together
//!
//! # Example
//!
//! ```no_run
//! use csvdrop::config::Config;
//! use csvdrop::db::Database;
//! use csvdrop::loader::PgBulkLoader;
//! use csvdrop::orchestrator::BatchOrchestrator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     dotenvy::dotenv().ok();
//!     let config = Config::from_env()?;
//!     let orchestrator = BatchOrchestrator::new("/srv/inbox", config.intake.max_in_flight)?;
//!
//!     let db = Database::connect(&config.database).await?;
//!     let loader = PgBulkLoader::new(&db, &config.intake.table);
//!     let report = orchestrator.run(&loader).await;
//!     db.close().await;
//!
//!     println!("{:?}", report?);
//!     Ok(())
//! }
//! ```

pub mod archiver;
pub mod config;
pub mod db;
pub mod error;
pub mod lister;
pub mod loader;
pub mod orchestrator;

// Re-export commonly used types
pub use archiver::{ArchiveDestination, ArchivePath, OutcomeArchiver};
pub use error::{IntakeError, LoadError, Result};
pub use lister::{FileLister, InputFile};
pub use loader::{BulkLoader, LoadOutcome, PgBulkLoader};
pub use orchestrator::{Batch, BatchOrchestrator, BatchReport, Termination};

use clap::Parser;
use config::TableName;
use std::path::PathBuf;

/// Load dropped CSV files into a table and archive them by outcome
#[derive(Parser, Debug)]
#[command(name = "csvdrop")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Folder to scan for .csv files
    pub folder: PathBuf,

    /// Target table, optionally schema-qualified
    #[arg(long, env = "CSVDROP_TABLE")]
    pub table: Option<TableName>,

    /// Loads dispatched ahead of their completion
    #[arg(long, env = "CSVDROP_MAX_IN_FLIGHT")]
    pub max_in_flight: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}
