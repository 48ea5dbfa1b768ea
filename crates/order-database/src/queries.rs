//! Query helpers over a raw connection.
//!
//! These take `&Connection` so they compose inside
//! [`Database::with_transaction`](crate::Database::with_transaction); the
//! allocator and the shipment batch both need several of them under one
//! transaction.

use crate::models::{Order, OrderStatus, Shipment};
use crate::DatabaseResult;
use rusqlite::{params, Connection};

/// Rows per multi-row INSERT statement. SQLite's bound-parameter limit is
/// the real ceiling here; 200 rows of 9 columns stays comfortably under it.
pub const INSERT_CHUNK_SIZE: usize = 200;

/// Highest allocated order identifier for an applicant, if any.
///
/// Identifiers are fixed-width (`A000`..`Z999`) so lexicographic MAX is
/// also numeric MAX.
pub fn select_max_order_id(
    conn: &Connection,
    applicant_key: &str,
) -> DatabaseResult<Option<String>> {
    let max: Option<String> = conn.query_row(
        "SELECT MAX(order_id) FROM orders WHERE applicant_key = ?1",
        params![applicant_key],
        |row| row.get(0),
    )?;
    Ok(max)
}

/// Insert order rows in chunks.
///
/// A uniqueness violation on (applicant_key, order_id) surfaces as
/// [`DatabaseError::UniqueViolation`](crate::DatabaseError::UniqueViolation);
/// run inside a transaction so a failed chunk rolls back the whole batch.
pub fn insert_orders(conn: &Connection, orders: &[Order]) -> DatabaseResult<()> {
    for chunk in orders.chunks(INSERT_CHUNK_SIZE) {
        let mut sql = String::from(
            "INSERT INTO orders
             (order_id, user_id, item_id, applicant_key, name, address, item_name, price, status)
             VALUES ",
        );
        let mut values: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(chunk.len() * 9);
        for (i, order) in chunk.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            let base = i * 9;
            sql.push_str(&format!(
                "(?{}, ?{}, ?{}, ?{}, ?{}, ?{}, ?{}, ?{}, ?{})",
                base + 1,
                base + 2,
                base + 3,
                base + 4,
                base + 5,
                base + 6,
                base + 7,
                base + 8,
                base + 9
            ));
            values.push(&order.order_id);
            values.push(&order.user_id);
            values.push(&order.item_id);
            values.push(&order.applicant_key);
            values.push(&order.name);
            values.push(&order.address);
            values.push(&order.item_name);
            values.push(&order.price);
            values.push(match order.status {
                OrderStatus::Unshipped => &"N",
                OrderStatus::Shipped => &"Y",
            });
        }
        conn.execute(&sql, values.as_slice())?;
    }
    Ok(())
}

/// Fetch orders for an applicant by identifier, ordered by identifier.
///
/// The ordering matters: receipt regeneration must render rows in the same
/// order they were allocated, so the regenerated artifact matches the
/// original byte for byte.
pub fn select_orders_by_ids(
    conn: &Connection,
    applicant_key: &str,
    order_ids: &[String],
) -> DatabaseResult<Vec<Order>> {
    if order_ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders: Vec<String> = (0..order_ids.len()).map(|i| format!("?{}", i + 2)).collect();
    let sql = format!(
        "SELECT order_id, user_id, item_id, applicant_key, name, address, item_name, price, status
         FROM orders
         WHERE applicant_key = ?1 AND order_id IN ({})
         ORDER BY order_id",
        placeholders.join(", ")
    );

    let mut values: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(order_ids.len() + 1);
    values.push(&applicant_key);
    for id in order_ids {
        values.push(id);
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(values.as_slice(), row_to_order)?;
    let mut orders = Vec::new();
    for row in rows {
        orders.push(row?);
    }
    Ok(orders)
}

/// Fetch up to `limit` unshipped orders, oldest first.
pub fn select_unshipped_orders(conn: &Connection, limit: usize) -> DatabaseResult<Vec<Order>> {
    let mut stmt = conn.prepare(
        "SELECT order_id, user_id, item_id, applicant_key, name, address, item_name, price, status
         FROM orders
         WHERE status = 'N'
         ORDER BY created_at, applicant_key, order_id
         LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit as i64], row_to_order)?;
    let mut orders = Vec::new();
    for row in rows {
        orders.push(row?);
    }
    Ok(orders)
}

/// Insert shipment rows in chunks.
pub fn insert_shipments(conn: &Connection, shipments: &[Shipment]) -> DatabaseResult<()> {
    for chunk in shipments.chunks(INSERT_CHUNK_SIZE) {
        let mut sql = String::from(
            "INSERT INTO shipments (shipment_id, order_id, item_id, applicant_key, address) VALUES ",
        );
        let mut values: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(chunk.len() * 5);
        for (i, shipment) in chunk.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            let base = i * 5;
            sql.push_str(&format!(
                "(?{}, ?{}, ?{}, ?{}, ?{})",
                base + 1,
                base + 2,
                base + 3,
                base + 4,
                base + 5
            ));
            values.push(&shipment.shipment_id);
            values.push(&shipment.order_id);
            values.push(&shipment.item_id);
            values.push(&shipment.applicant_key);
            values.push(&shipment.address);
        }
        conn.execute(&sql, values.as_slice())?;
    }
    Ok(())
}

/// Flip the status flag to shipped for the given orders.
pub fn mark_orders_shipped(conn: &Connection, orders: &[Order]) -> DatabaseResult<usize> {
    let mut updated = 0;
    let mut stmt = conn.prepare(
        "UPDATE orders SET status = 'Y' WHERE applicant_key = ?1 AND order_id = ?2",
    )?;
    for order in orders {
        updated += stmt.execute(params![order.applicant_key, order.order_id])?;
    }
    Ok(updated)
}

fn row_to_order(row: &rusqlite::Row) -> rusqlite::Result<Order> {
    let status: String = row.get(8)?;
    Ok(Order {
        order_id: row.get(0)?,
        user_id: row.get(1)?,
        item_id: row.get(2)?,
        applicant_key: row.get(3)?,
        name: row.get(4)?,
        address: row.get(5)?,
        item_name: row.get(6)?,
        price: row.get(7)?,
        status: OrderStatus::from_flag(&status),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_migrations;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn order(applicant_key: &str, order_id: &str) -> Order {
        Order {
            order_id: order_id.to_string(),
            user_id: "user-1".to_string(),
            item_id: "item-1".to_string(),
            applicant_key: applicant_key.to_string(),
            name: "Kim".to_string(),
            address: "Seoul".to_string(),
            item_name: "Keyboard".to_string(),
            price: "42000".to_string(),
            status: OrderStatus::Unshipped,
        }
    }

    // ============================================================================
    // Max identifier
    // ============================================================================

    #[test]
    fn max_order_id_empty_table() {
        let conn = test_conn();
        assert_eq!(select_max_order_id(&conn, "APPL-1").unwrap(), None);
    }

    #[test]
    fn max_order_id_is_per_applicant() {
        let conn = test_conn();
        insert_orders(&conn, &[order("APPL-1", "A005"), order("APPL-2", "C000")]).unwrap();

        assert_eq!(
            select_max_order_id(&conn, "APPL-1").unwrap(),
            Some("A005".to_string())
        );
        assert_eq!(
            select_max_order_id(&conn, "APPL-2").unwrap(),
            Some("C000".to_string())
        );
    }

    #[test]
    fn max_order_id_crosses_letter_boundary() {
        let conn = test_conn();
        insert_orders(&conn, &[order("APPL-1", "A999"), order("APPL-1", "B000")]).unwrap();

        assert_eq!(
            select_max_order_id(&conn, "APPL-1").unwrap(),
            Some("B000".to_string())
        );
    }

    // ============================================================================
    // Inserts
    // ============================================================================

    #[test]
    fn insert_orders_in_multiple_chunks() {
        let conn = test_conn();
        let orders: Vec<Order> = (0..INSERT_CHUNK_SIZE + 5)
            .map(|i| order("APPL-1", &format!("A{i:03}")))
            .collect();
        insert_orders(&conn, &orders).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count as usize, INSERT_CHUNK_SIZE + 5);
    }

    #[test]
    fn duplicate_order_id_is_unique_violation() {
        let conn = test_conn();
        insert_orders(&conn, &[order("APPL-1", "A000")]).unwrap();

        let err = insert_orders(&conn, &[order("APPL-1", "A000")]).unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn same_order_id_allowed_across_applicants() {
        let conn = test_conn();
        insert_orders(&conn, &[order("APPL-1", "A000"), order("APPL-2", "A000")]).unwrap();
    }

    // ============================================================================
    // Lookup
    // ============================================================================

    #[test]
    fn select_by_ids_orders_by_identifier() {
        let conn = test_conn();
        insert_orders(
            &conn,
            &[
                order("APPL-1", "B001"),
                order("APPL-1", "A002"),
                order("APPL-1", "A000"),
            ],
        )
        .unwrap();

        let found = select_orders_by_ids(
            &conn,
            "APPL-1",
            &["B001".to_string(), "A000".to_string(), "A002".to_string()],
        )
        .unwrap();
        let ids: Vec<&str> = found.iter().map(|o| o.order_id.as_str()).collect();
        assert_eq!(ids, vec!["A000", "A002", "B001"]);
    }

    #[test]
    fn select_by_ids_empty_input() {
        let conn = test_conn();
        let found = select_orders_by_ids(&conn, "APPL-1", &[]).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn select_by_ids_ignores_other_applicants() {
        let conn = test_conn();
        insert_orders(&conn, &[order("APPL-1", "A000"), order("APPL-2", "A000")]).unwrap();

        let found = select_orders_by_ids(&conn, "APPL-1", &["A000".to_string()]).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].applicant_key, "APPL-1");
    }

    // ============================================================================
    // Shipment batch
    // ============================================================================

    #[test]
    fn unshipped_selection_respects_limit_and_flag() {
        let conn = test_conn();
        let mut shipped = order("APPL-1", "A000");
        shipped.status = OrderStatus::Shipped;
        insert_orders(
            &conn,
            &[shipped, order("APPL-1", "A001"), order("APPL-1", "A002")],
        )
        .unwrap();

        let unshipped = select_unshipped_orders(&conn, 10).unwrap();
        assert_eq!(unshipped.len(), 2);

        let limited = select_unshipped_orders(&conn, 1).unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn mark_shipped_flips_flag() {
        let conn = test_conn();
        let rows = vec![order("APPL-1", "A000"), order("APPL-1", "A001")];
        insert_orders(&conn, &rows).unwrap();

        let updated = mark_orders_shipped(&conn, &rows).unwrap();
        assert_eq!(updated, 2);
        assert!(select_unshipped_orders(&conn, 10).unwrap().is_empty());
    }

    #[test]
    fn shipments_insert_and_count() {
        let conn = test_conn();
        let rows = vec![order("APPL-1", "A000")];
        insert_orders(&conn, &rows).unwrap();
        let shipments: Vec<Shipment> = rows.iter().map(Shipment::from_order).collect();
        insert_shipments(&conn, &shipments).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM shipments", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
