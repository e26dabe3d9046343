//! SQLite-backed store.
//!
//! [`Store`] owns a connection pool and implements every operation trait.
//! Each trait's default methods delegate to free functions that take the
//! pool, so the operations stay testable without the wrapper.
//!
//! Writes that read before deciding (WIP checks, key generation, stand-up
//! start) open their transaction with a write to the row they depend on, so
//! SQLite grants the write lock before anything is read.

use std::{str::FromStr, time::Duration};

use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Sqlite, SqlitePool, Transaction,
};

use crate::{config::Config, domain::ProjectKey, Error, Result};

#[cfg(test)]
pub(crate) mod fixtures;
mod projects;
pub(crate) mod rows;
mod schema;
mod scopes;
mod sprints;
mod users;

pub use projects::ProjectOps;
pub use scopes::ScopeOps;
pub use sprints::SprintOps;
pub use users::{AssignmentOps, UserOps};

/// Access to the pool every operation trait runs against.
pub trait PoolAccess {
    fn pool(&self) -> &SqlitePool;
}

/// Database handle with connection pooling.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
    default_wip_limit: u32,
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

impl Store {
    /// Open the database named by `config.database_url`, creating it and its
    /// schema when missing.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` for an unparseable URL and
    /// `Error::Persistence` if the database cannot be opened or initialized.
    pub async fn connect(config: &Config) -> Result<Self> {
        config.validate()?;

        let in_memory = is_in_memory(&config.database_url);
        let options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| {
                Error::InvalidConfig(format!(
                    "Invalid database_url '{}': {e}",
                    config.database_url
                ))
            })?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms));
        let options = if in_memory {
            options
        } else {
            options.journal_mode(SqliteJournalMode::Wal)
        };

        // every connection to :memory: is its own database
        let max_connections = if in_memory { 1 } else { config.max_connections };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| Error::persistence(format!("Failed to connect to database: {e}")))?;

        tracing::debug!(
            database_url = %config.database_url,
            max_connections,
            "database pool opened"
        );
        Self::from_pool(pool, config.default_wip_limit).await
    }

    /// A private in-memory database, mostly for tests.
    ///
    /// # Errors
    ///
    /// Returns `Error::Persistence` if the schema cannot be applied.
    pub async fn open_in_memory() -> Result<Self> {
        Self::connect(&Config {
            database_url: "sqlite::memory:".to_string(),
            ..Config::default()
        })
        .await
    }

    /// Wrap an existing pool and apply the schema.
    ///
    /// # Errors
    ///
    /// Returns `Error::Persistence` if the schema cannot be applied.
    pub async fn from_pool(pool: SqlitePool, default_wip_limit: u32) -> Result<Self> {
        schema::init_schema(&pool).await?;
        Ok(Self {
            pool,
            default_wip_limit,
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub const fn default_wip_limit(&self) -> u32 {
        self.default_wip_limit
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl PoolAccess for Store {
    fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl ProjectOps for Store {
    fn default_wip_limit(&self) -> u32 {
        self.default_wip_limit
    }
}

impl crate::issues::IssueOps for Store {}
impl crate::metrics::MetricsOps for Store {}
impl crate::standups::StandupOps for Store {}
impl UserOps for Store {}
impl AssignmentOps for Store {}
impl ScopeOps for Store {}
impl SprintOps for Store {}

/// Take the write lock through the project row.
///
/// Run first in a transaction whose later reads must not go stale.
pub(crate) async fn claim_project(
    tx: &mut Transaction<'_, Sqlite>,
    project_key: &ProjectKey,
) -> Result<()> {
    let claimed = sqlx::query("UPDATE projects SET issue_count = issue_count WHERE project_key = ?")
        .bind(project_key.as_str())
        .execute(&mut **tx)
        .await?
        .rows_affected();
    if claimed == 0 {
        Err(Error::not_found("project", project_key))
    } else {
        Ok(())
    }
}
