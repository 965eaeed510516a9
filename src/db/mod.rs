pub mod connection;
pub mod models;
pub mod repos;
pub mod schema;

use diesel::SqliteConnection;

use crate::error::BoardResult;
use connection::{establish_connection, DbPool};

/// Storage handle shared by every request.
///
/// Opened once at boot and handed to the HTTP layer; dropping the last clone
/// closes the pooled connections. Diesel is synchronous, so each unit of work
/// runs on tokio's blocking pool with a connection checked out for its whole
/// duration.
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open (or create) the SQLite file at `database_url` and apply pending
    /// migrations.
    pub fn open(database_url: &str, max_connections: u32) -> BoardResult<Self> {
        let pool = establish_connection(database_url, max_connections)?;
        tracing::debug!(database_url, max_connections, "storage pool ready");
        Ok(Database { pool })
    }

    pub async fn run<F, T>(&self, work: F) -> BoardResult<T>
    where
        F: FnOnce(&mut SqliteConnection) -> BoardResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut pooled = pool.get()?;
            work(&mut *pooled)
        })
        .await?
    }

    pub fn close(self) {
        let state = self.pool.state();
        tracing::info!(
            connections = state.connections,
            idle = state.idle_connections,
            "closing storage"
        );
    }
}
