//! Database module: the connection handle, its startup sequence and the
//! entry queries.
//!
//! Layout:
//! - `bootstrap.rs`: availability wait and migrations over a borrowed connection
//! - `entries.rs`: queries over the `entries` table
//! - `models.rs`: Rust structs mirroring DB rows

pub mod bootstrap;
pub mod entries;
pub mod models;

use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use tracing::{error, info};

pub use bootstrap::{EmbeddedMigrations, MigrationOutcome, PING_INTERVAL};
pub use models::{Entry, IndexedEntry, KeyCount};

use crate::error::ExplError;

pub type SqlitePool = Pool<Sqlite>;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Owned handle to the connection pool. Clones share the pool; [`ExplDb::close`]
/// shuts it down for all of them.
#[derive(Clone)]
pub struct ExplDb {
    pool: SqlitePool,
}

impl ExplDb {
    /// Open the pool, wait for the database and apply pending migrations.
    ///
    /// Blocks until the database answers. Fails if the migrations fail.
    pub async fn init(database_url: &str) -> Result<Self, ExplError> {
        let pool = SqlitePoolOptions::new()
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_lazy(database_url)?;

        bootstrap::wait_until_available(&pool, PING_INTERVAL).await?;

        match bootstrap::migrate(&pool, &EmbeddedMigrations::default()).await {
            Ok(MigrationOutcome::Applied(count)) => info!(count, "database migrations applied"),
            Ok(MigrationOutcome::UpToDate) => info!("database schema is up to date"),
            Err(e) => {
                error!(error = %e, "database migration failed");
                pool.close().await;
                return Err(e);
            }
        }

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool. Consumes the handle so it cannot be closed twice
    /// through the same value.
    pub async fn close(self) {
        self.pool.close().await;
    }
}
