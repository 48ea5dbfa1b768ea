//! Database connection wrapper.

use crate::models::Order;
use crate::{migrations, queries, DatabaseError, DatabaseResult};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// SQLite database handle shared across the daemon.
///
/// The connection lives behind a mutex so `Arc<Database>` is `Send + Sync`
/// and can be handed to the background workers. Callers hold the lock only
/// for the duration of one statement or one transaction.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database at the given path and run migrations.
    pub fn open(path: &Path) -> DatabaseResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        configure(&conn)?;
        migrations::run_migrations(&conn)?;

        info!(path = %path.display(), "Database opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database for tests.
    pub fn open_in_memory() -> DatabaseResult<Self> {
        let conn = Connection::open_in_memory()?;
        configure(&conn)?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` inside a transaction. Commits on `Ok`, rolls back on `Err`.
    ///
    /// Generic over the caller's error type so code composing queries with
    /// its own failure modes can abort the transaction with them directly.
    pub fn with_transaction<T, E>(
        &self,
        f: impl FnOnce(&rusqlite::Transaction) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<DatabaseError>,
    {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction().map_err(DatabaseError::from)?;
        let result = f(&tx)?;
        tx.commit().map_err(DatabaseError::from)?;
        Ok(result)
    }

    /// Run `f` against the raw connection, outside a transaction.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> DatabaseResult<T>,
    ) -> DatabaseResult<T> {
        let conn = self.conn.lock().expect("database lock poisoned");
        f(&conn)
    }

    /// Highest allocated order identifier for an applicant.
    pub fn max_order_id(&self, applicant_key: &str) -> DatabaseResult<Option<String>> {
        self.with_connection(|conn| queries::select_max_order_id(conn, applicant_key))
    }

    /// Fetch orders for an applicant by identifier, ordered by identifier.
    pub fn find_orders_by_ids(
        &self,
        applicant_key: &str,
        order_ids: &[String],
    ) -> DatabaseResult<Vec<Order>> {
        self.with_connection(|conn| queries::select_orders_by_ids(conn, applicant_key, order_ids))
    }

}

/// Connection pragmas applied to every handle.
fn configure(conn: &Connection) -> DatabaseResult<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
        ",
    )?;
    Ok(())
}
