//! Database migrations.
//!
//! Migrations are run in order and tracked in the `migrations` table.

use crate::{DatabaseError, DatabaseResult};
use rusqlite::Connection;
use tracing::info;

/// Current schema version.
pub const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> DatabaseResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current_version < CURRENT_VERSION {
        info!(current_version, target_version = CURRENT_VERSION, "Running migrations");
    }

    if current_version < 1 {
        migrate_v1_initial_schema(conn)?;
    }

    Ok(())
}

/// v1: order and shipment tables.
///
/// The composite primary key on (applicant_key, order_id) is the collision
/// detector for concurrent identifier allocation: two transactions that read
/// the same maximum will insert overlapping ranges and one of them fails
/// with a constraint violation.
fn migrate_v1_initial_schema(conn: &Connection) -> DatabaseResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE orders (
            order_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            item_id TEXT NOT NULL,
            applicant_key TEXT NOT NULL,
            name TEXT NOT NULL,
            address TEXT NOT NULL,
            item_name TEXT NOT NULL,
            price TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'N',
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (applicant_key, order_id)
        );

        CREATE INDEX idx_orders_status ON orders (applicant_key, status);

        CREATE TABLE shipments (
            shipment_id TEXT NOT NULL,
            order_id TEXT NOT NULL,
            item_id TEXT NOT NULL,
            applicant_key TEXT NOT NULL,
            address TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (applicant_key, shipment_id)
        );
        ",
    )
    .map_err(|e| DatabaseError::Migration(format!("v1 initial schema: {e}")))?;

    conn.execute(
        "INSERT INTO migrations (version, name) VALUES (1, 'initial_schema')",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn schema_has_order_and_shipment_tables() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type = 'table' AND name IN ('orders', 'shipments')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
    }
}
