//! Startup sequence for the database: wait until it answers, then bring the
//! schema up to date over one borrowed connection.
//!
//! Ownership rule: only the code that checked a connection out releases it.
//! [`MigrationDriver`] is built over a `&mut` borrow of that connection and
//! has no way to close it, so nothing can close it a second time.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use backon::{ConstantBuilder, Retryable};
use sqlx::migrate::{Migrate, Migrator};
use sqlx::pool::PoolConnection;
use sqlx::{Connection, Sqlite, SqliteConnection};
use tracing::info;

use super::SqlitePool;
use crate::error::ExplError;

/// Delay between two availability pings.
pub const PING_INTERVAL: Duration = Duration::from_secs(1);

/// The schema migrations, embedded at build time and ordered by version.
pub static MIGRATOR: Migrator = sqlx::migrate!();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// This many migrations were applied.
    Applied(usize),
    /// Nothing was pending.
    UpToDate,
}

/// Something that can tell whether the database is up and hand out single
/// connections.
pub trait ConnectionSource: Sync {
    type Connection: Send;

    fn ping(&self) -> impl Future<Output = Result<(), ExplError>> + Send;

    fn checkout(&self) -> impl Future<Output = Result<Self::Connection, ExplError>> + Send;

    /// Give back a connection obtained from [`ConnectionSource::checkout`].
    fn release(
        &self,
        conn: Self::Connection,
    ) -> impl Future<Output = Result<(), ExplError>> + Send;
}

/// A migration set that can be applied over one connection it does not own.
pub trait MigrationSet<C>: Sync {
    fn up(&self, conn: &mut C) -> impl Future<Output = Result<MigrationOutcome, ExplError>> + Send;
}

/// Ping `source` every `interval` until it answers. There is no deadline:
/// nothing can be served before the database is up.
pub async fn wait_until_available<S>(source: &S, interval: Duration) -> Result<(), ExplError>
where
    S: ConnectionSource,
{
    let policy = ConstantBuilder::default()
        .with_delay(interval)
        .with_max_times(usize::MAX);

    (|| source.ping())
        .retry(policy)
        .notify(|err: &ExplError, _| {
            info!(error = %err, "Waiting for database...");
        })
        .await
}

/// Check out one connection, apply `migrations` over it and release it.
///
/// The connection is released exactly once whether or not the migrations
/// succeed; a release failure is reported together with the migration error.
pub async fn migrate<S, M>(source: &S, migrations: &M) -> Result<MigrationOutcome, ExplError>
where
    S: ConnectionSource,
    M: MigrationSet<S::Connection>,
{
    let mut conn = source.checkout().await?;
    let outcome = migrations.up(&mut conn).await;
    let released = source.release(conn).await;
    ExplError::aggregate(outcome, released)
}

impl ConnectionSource for SqlitePool {
    type Connection = PoolConnection<Sqlite>;

    async fn ping(&self) -> Result<(), ExplError> {
        let mut conn = self.acquire().await?;
        conn.ping().await?;
        Ok(())
    }

    async fn checkout(&self) -> Result<Self::Connection, ExplError> {
        Ok(self.acquire().await?)
    }

    async fn release(&self, conn: Self::Connection) -> Result<(), ExplError> {
        // Dropping a pool connection hands it back to the pool.
        drop(conn);
        Ok(())
    }
}

/// The embedded migration source. It is a static, so there is nothing to
/// open or close.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedMigrations {
    migrator: &'static Migrator,
}

impl EmbeddedMigrations {
    pub fn new(migrator: &'static Migrator) -> Self {
        Self { migrator }
    }
}

impl Default for EmbeddedMigrations {
    fn default() -> Self {
        Self::new(&MIGRATOR)
    }
}

impl MigrationSet<PoolConnection<Sqlite>> for EmbeddedMigrations {
    async fn up(&self, conn: &mut PoolConnection<Sqlite>) -> Result<MigrationOutcome, ExplError> {
        MigrationDriver::bind(&mut **conn).up(self.migrator).await
    }
}

/// Migration driver bound to a single borrowed connection.
///
/// Has no `close`: the connection belongs to whoever checked it out.
pub struct MigrationDriver<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> MigrationDriver<'c> {
    pub fn bind(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    pub async fn up(&mut self, migrator: &Migrator) -> Result<MigrationOutcome, ExplError> {
        self.conn.ensure_migrations_table().await?;
        let applied: HashSet<i64> = self
            .conn
            .list_applied_migrations()
            .await?
            .into_iter()
            .map(|m| m.version)
            .collect();

        let pending: Vec<_> = migrator
            .iter()
            .filter(|m| !m.migration_type.is_down_migration() && !applied.contains(&m.version))
            .collect();
        if pending.is_empty() {
            return Ok(MigrationOutcome::UpToDate);
        }

        for m in &pending {
            info!(version = m.version, description = %m.description, "applying migration");
        }
        migrator.run_direct(&mut *self.conn).await?;
        Ok(MigrationOutcome::Applied(pending.len()))
    }
}
