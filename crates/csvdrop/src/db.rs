//! Storage client
//!
//! The pool is created once per run, handed to the loader, and closed before
//! the process exits.

use crate::config::DbConfig;
use crate::error::Result;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Handle on the storage backend
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
    max_connections: u32,
}

impl Database {
    /// Open the pool and verify the server answers
    pub async fn connect(config: &DbConfig) -> Result<Self> {
        let options = config.connect_options()?;

        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .min_connections(0)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect_with(options)
            .await?;

        let db = Self {
            pool,
            max_connections: config.pool_size,
        };
        db.health_check().await?;

        tracing::info!(max_connections = config.pool_size, "Database connection pool created");

        Ok(db)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections as usize
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Wait for checked-out connections to return, then close them
    pub async fn close(self) {
        self.pool.close().await;
        tracing::debug!("Database connection pool closed");
    }
}
