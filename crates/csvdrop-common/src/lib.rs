//! csvdrop Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared plumbing for the csvdrop workspace members:
//!
//! - **Logging**: subscriber setup driven by `LOG_*` environment variables
//! - **Environment**: typed readers for configuration variables
//!
//! # Example
//!
//! ```no_run
//! use csvdrop_common::env::env_parse;
//! use csvdrop_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LogConfig::from_env(LogConfig::default())?;
//!     let _guard = init_logging(&config)?;
//!
//!     let port: u16 = env_parse("CSVDROP_DB_PORT")?.unwrap_or(5432);
//!     tracing::info!(port, "Configured");
//!     Ok(())
//! }
//! ```

pub mod env;
pub mod logging;

pub use env::{EnvError, EnvResult};
