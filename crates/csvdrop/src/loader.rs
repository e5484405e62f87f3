//! Bulk loading of one file into the target table
//!
//! The file is streamed to the server untouched; CSV parsing happens in
//! Postgres' `COPY`. Rows land in a temporary staging table first so the two
//! timestamp columns can be filled server-side, and the whole load runs in one
//! transaction: a file either contributes all of its rows or none.

use crate::config::TableName;
use crate::db::Database;
use crate::error::LoadError;
use crate::lister::InputFile;
use async_trait::async_trait;
use sqlx::postgres::PgPool;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::sync::Semaphore;
use tracing::debug;

/// Bytes sent per `CopyData` message
const COPY_CHUNK_SIZE: usize = 64 * 1024;

/// Session-local table the file is copied into before insertion
const STAGING_TABLE: &str = "csvdrop_staging";

/// Result of one load attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Success { rows: u64 },
    Failure { reason: String },
}

impl LoadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, LoadOutcome::Success { .. })
    }
}

impl From<Result<u64, LoadError>> for LoadOutcome {
    fn from(result: Result<u64, LoadError>) -> Self {
        match result {
            Ok(rows) => LoadOutcome::Success { rows },
            Err(e) => LoadOutcome::Failure {
                reason: e.to_string(),
            },
        }
    }
}

/// Loads a single file into storage
///
/// Implementations report problems through [`LoadOutcome::Failure`] rather
/// than an error: one bad file must not stop the rest of the batch.
#[async_trait]
pub trait BulkLoader: Send + Sync {
    async fn load(&self, file: &InputFile) -> LoadOutcome;
}

/// [`BulkLoader`] backed by Postgres `COPY FROM STDIN`
///
/// Loads queue here for a connection slot instead of inside the pool, so a
/// long backlog never runs into the pool's acquire timeout.
#[derive(Debug, Clone)]
pub struct PgBulkLoader {
    pool: PgPool,
    slots: Arc<Semaphore>,
    statements: LoadStatements,
}

impl PgBulkLoader {
    pub fn new(db: &Database, table: &TableName) -> Self {
        Self::from_pool(db.pool().clone(), table)
    }

    /// One slot per pool connection
    pub fn from_pool(pool: PgPool, table: &TableName) -> Self {
        let slots = pool.options().get_max_connections().max(1) as usize;
        Self {
            pool,
            slots: Arc::new(Semaphore::new(slots)),
            statements: LoadStatements::new(table),
        }
    }

    async fn try_load(&self, file: &InputFile) -> Result<u64, LoadError> {
        let _slot = self.slots.acquire().await.map_err(|_| LoadError::Closed)?;

        let read_err = |source: std::io::Error| LoadError::Read {
            path: file.path().to_path_buf(),
            source,
        };
        let mut reader = tokio::fs::File::open(file.path()).await.map_err(read_err)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(&self.statements.create_staging)
            .execute(&mut *tx)
            .await?;

        let mut copy = tx.copy_in_raw(&self.statements.copy).await?;
        let mut buf = vec![0u8; COPY_CHUNK_SIZE];
        loop {
            let n = match reader.read(&mut buf).await {
                Ok(n) => n,
                Err(e) => {
                    let err = read_err(e);
                    // leaves the connection usable; the transaction is rolled back on drop
                    copy.abort(err.to_string()).await.ok();
                    return Err(err);
                },
            };
            if n == 0 {
                break;
            }
            copy.send(&buf[..n]).await?;
        }
        let staged = copy.finish().await?;

        let inserted = sqlx::query(&self.statements.insert)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        debug!(
            file = %file.path().display(),
            staged,
            inserted,
            "Bulk load committed"
        );

        Ok(inserted)
    }
}

#[async_trait]
impl BulkLoader for PgBulkLoader {
    async fn load(&self, file: &InputFile) -> LoadOutcome {
        self.try_load(file).await.into()
    }
}

/// SQL issued for every load, rendered once per table
#[derive(Debug, Clone, PartialEq, Eq)]
struct LoadStatements {
    create_staging: String,
    copy: String,
    insert: String,
}

impl LoadStatements {
    fn new(table: &TableName) -> Self {
        Self {
            create_staging: format!(
                "CREATE TEMPORARY TABLE {STAGING_TABLE} \
                 (name text, email text, something text) ON COMMIT DROP"
            ),
            copy: format!(
                "COPY {STAGING_TABLE} (name, email, something) FROM STDIN \
                 WITH (FORMAT csv, HEADER true, DELIMITER ',', QUOTE '\"')"
            ),
            insert: format!(
                "INSERT INTO {} (name, email, something, \"createdAt\", \"updatedAt\") \
                 SELECT name, email, something, NOW(), NOW() FROM {STAGING_TABLE}",
                table.quoted()
            ),
        }
    }
}
