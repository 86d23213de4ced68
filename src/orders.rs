//! Order dispatch and fulfillment for OTAKU POS.
//!
//! Orders are the persisted half of a tab: each item added at the POS
//! becomes one order scoped to a single station, so kitchen and bar streams
//! never share an order. The boards read all orders carrying at least one
//! item of their station and flip an order to `paid` once staff has marked
//! every station-relevant line complete.
//!
//! Item completion lives in a single [`CompletionState`] owned here and
//! shared by both boards.

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::DbState;
use crate::error::{PosError, PosResult};
use crate::menu::Station;

/// One line of an order dispatch, price already resolved from the catalog.
#[derive(Debug, Clone)]
pub struct DispatchItem {
    pub menu_item_id: String,
    pub quantity: i64,
    pub price: f64,
}

// ---------------------------------------------------------------------------
// Completion tracking
// ---------------------------------------------------------------------------

/// Tauri managed state: the set of completed line items, keyed by
/// `(order_id, menu_item_id)`. Single source of truth for both boards.
#[derive(Default)]
pub struct CompletionState {
    completed: Mutex<HashSet<(String, String)>>,
}

impl CompletionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_complete(&self, order_id: &str, menu_item_id: &str) -> bool {
        self.completed
            .lock()
            .map(|set| set.contains(&(order_id.to_string(), menu_item_id.to_string())))
            .unwrap_or(false)
    }

    /// Flip membership and return the new state.
    fn toggle(&self, order_id: &str, menu_item_id: &str) -> PosResult<bool> {
        let mut set = self
            .completed
            .lock()
            .map_err(|e| PosError::Database(e.to_string()))?;
        let key = (order_id.to_string(), menu_item_id.to_string());
        if set.remove(&key) {
            Ok(false)
        } else {
            set.insert(key);
            Ok(true)
        }
    }

    fn clear(&self) {
        if let Ok(mut set) = self.completed.lock() {
            set.clear();
        }
    }
}

// ---------------------------------------------------------------------------
// Order creation
// ---------------------------------------------------------------------------

/// Create one order plus its line items atomically; this is the single
/// write path the POS dispatch uses. Either the order and all its items land, or
/// nothing does.
pub fn create_order_with_items(
    db: &DbState,
    customer_name: &str,
    table_number: i64,
    employee_id: &str,
    items: &[DispatchItem],
) -> PosResult<Value> {
    if items.is_empty() {
        return Err(PosError::validation("Order has no items"));
    }
    if customer_name.trim().is_empty() {
        return Err(PosError::validation("Customer name is required"));
    }

    let order_id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    let conn = db
        .conn
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;
    conn.execute_batch("BEGIN IMMEDIATE")
        .map_err(|e| PosError::Database(format!("begin transaction: {e}")))?;

    let result = (|| -> PosResult<()> {
        conn.execute(
            "INSERT INTO orders (id, customer_name, table_number, status, employee_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, 'pending', ?4, ?5, ?5)",
            params![order_id, customer_name.trim(), table_number, employee_id, now],
        )?;

        for item in items {
            conn.execute(
                "INSERT INTO order_items (id, order_id, menu_item_id, quantity, price, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    Uuid::new_v4().to_string(),
                    order_id,
                    item.menu_item_id,
                    item.quantity,
                    item.price,
                    now,
                ],
            )?;
        }
        Ok(())
    })();

    match result {
        Ok(()) => {
            conn.execute_batch("COMMIT")
                .map_err(|e| PosError::Database(format!("commit: {e}")))?;
        }
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            return Err(e);
        }
    }

    info!(order_id = %order_id, customer = %customer_name, items = items.len(), "Order created");

    Ok(serde_json::json!({
        "id": order_id,
        "customer_name": customer_name.trim(),
        "table_number": table_number,
        "status": "pending",
        "employee_id": employee_id,
        "created_at": now,
    }))
}

// ---------------------------------------------------------------------------
// Station board queries
// ---------------------------------------------------------------------------

struct OrderRow {
    id: String,
    customer_name: String,
    table_number: i64,
    status: String,
    created_at: String,
    updated_at: String,
    items: Vec<Value>,
    station_item_ids: Vec<String>,
}

/// Load every order joined to its items and menu rows, keeping only orders
/// with at least one line in the given station's categories.
fn load_station_orders(
    db: &DbState,
    completion: &CompletionState,
    station: Station,
) -> PosResult<Vec<OrderRow>> {
    let conn = db
        .conn
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;

    let mut stmt = conn.prepare(
        "SELECT o.id, o.customer_name, o.table_number, o.status, o.created_at, o.updated_at,
                oi.id, oi.quantity, oi.price, oi.menu_item_id, m.name, m.category
         FROM orders o
         JOIN order_items oi ON oi.order_id = o.id
         LEFT JOIN menu_items m ON m.id = oi.menu_item_id
         ORDER BY o.created_at ASC, o.id ASC, oi.created_at ASC",
    )?;

    type JoinRow = (
        String,
        String,
        i64,
        String,
        String,
        String,
        String,
        i64,
        f64,
        String,
        Option<String>,
        Option<String>,
    );
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, String>(6)?,
            row.get::<_, i64>(7)?,
            row.get::<_, f64>(8)?,
            row.get::<_, String>(9)?,
            row.get::<_, Option<String>>(10)?,
            row.get::<_, Option<String>>(11)?,
        ))
    })?;

    let mut orders: Vec<OrderRow> = Vec::new();
    for row in rows {
        let (
            order_id,
            customer_name,
            table_number,
            status,
            created_at,
            updated_at,
            item_id,
            quantity,
            price,
            menu_item_id,
            menu_name,
            menu_category,
        ): JoinRow = row?;

        if orders.last().map(|o| o.id.as_str()) != Some(order_id.as_str()) {
            orders.push(OrderRow {
                id: order_id.clone(),
                customer_name,
                table_number,
                status,
                created_at,
                updated_at,
                items: Vec::new(),
                station_item_ids: Vec::new(),
            });
        }
        let Some(order) = orders.last_mut() else {
            continue;
        };

        // A line whose menu row was deleted has no category and belongs to
        // no station.
        let in_station = menu_category
            .as_deref()
            .map(|c| station.categories().contains(&c))
            .unwrap_or(false);
        if in_station {
            order.station_item_ids.push(menu_item_id.clone());
        }

        let menu_json = match (&menu_name, &menu_category) {
            (Some(name), Some(category)) => serde_json::json!({
                "id": menu_item_id,
                "name": name,
                "category": category,
            }),
            _ => Value::Null,
        };
        order.items.push(serde_json::json!({
            "id": item_id,
            "quantity": quantity,
            "price": price,
            "menu_item_id": menu_item_id,
            "in_station": in_station,
            "completed": completion.is_complete(&order.id, &menu_item_id),
            "menu_items": menu_json,
        }));
    }

    orders.retain(|o| !o.station_item_ids.is_empty());
    Ok(orders)
}

/// Board payload for a station: pending orders grouped by customer (oldest
/// first inside each group, groups sorted by name) and paid history, newest
/// first.
pub fn list_station_orders(
    db: &DbState,
    completion: &CompletionState,
    station: Station,
) -> PosResult<Value> {
    let orders = load_station_orders(db, completion, station)?;
    let now = Utc::now();

    let mut pending_groups: Vec<(String, Vec<Value>)> = Vec::new();
    let mut paid: Vec<Value> = Vec::new();

    for order in &orders {
        let json = serde_json::json!({
            "id": order.id,
            "customer_name": order.customer_name,
            "table_number": order.table_number,
            "status": order.status,
            "created_at": order.created_at,
            "updated_at": order.updated_at,
            "age_minutes": order_age_minutes(&order.created_at, now),
            "age_band": order_age_band(&order.created_at, now),
            "age_text": order_age_text(&order.created_at, now),
            "order_items": order.items,
        });
        if order.status == "pending" {
            match pending_groups
                .iter_mut()
                .find(|(name, _)| name == &order.customer_name)
            {
                Some((_, group)) => group.push(json),
                None => pending_groups.push((order.customer_name.clone(), vec![json])),
            }
        } else {
            paid.push(json);
        }
    }

    pending_groups.sort_by(|(a, _), (b, _)| a.cmp(b));
    paid.sort_by(|a, b| {
        b["updated_at"]
            .as_str()
            .unwrap_or("")
            .cmp(a["updated_at"].as_str().unwrap_or(""))
    });

    let pending_count: usize = pending_groups.iter().map(|(_, g)| g.len()).sum();
    let grouped: Vec<Value> = pending_groups
        .into_iter()
        .map(|(name, group)| serde_json::json!({ "customer_name": name, "orders": group }))
        .collect();

    Ok(serde_json::json!({
        "station": station,
        "pending": grouped,
        "pending_count": pending_count,
        "paid": paid,
    }))
}

// ---------------------------------------------------------------------------
// Completion toggles
// ---------------------------------------------------------------------------

/// Flip one line's completion state on a station board.
///
/// When the flip leaves every station-relevant line of the order complete,
/// the order is promoted to `paid` exactly once, guarded by the
/// `status = 'pending'` predicate. A failed status write leaves the
/// completion set flipped and only logs the failure.
pub fn toggle_item_complete(
    db: &DbState,
    completion: &CompletionState,
    station: Station,
    order_id: &str,
    menu_item_id: &str,
) -> PosResult<Value> {
    let now_complete = completion.toggle(order_id, menu_item_id)?;

    let mut all_complete = false;
    let mut status_updated = false;

    if now_complete {
        let station_item_ids = {
            let conn = db
                .conn
                .lock()
                .map_err(|e| PosError::Database(e.to_string()))?;
            let mut stmt = conn.prepare(
                "SELECT oi.menu_item_id, m.category
                 FROM order_items oi
                 LEFT JOIN menu_items m ON m.id = oi.menu_item_id
                 WHERE oi.order_id = ?1",
            )?;
            let rows = stmt.query_map(params![order_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                ))
            })?;
            let mut ids = Vec::new();
            for row in rows {
                let (item_id, category) = row?;
                if category
                    .as_deref()
                    .map(|c| station.categories().contains(&c))
                    .unwrap_or(false)
                {
                    ids.push(item_id);
                }
            }
            ids
        };

        all_complete = !station_item_ids.is_empty()
            && station_item_ids
                .iter()
                .all(|id| completion.is_complete(order_id, id));

        if all_complete {
            let conn = db
                .conn
                .lock()
                .map_err(|e| PosError::Database(e.to_string()))?;
            let now = Utc::now().to_rfc3339();
            match conn.execute(
                "UPDATE orders SET status = 'paid', updated_at = ?1
                 WHERE id = ?2 AND status = 'pending'",
                params![now, order_id],
            ) {
                Ok(changed) => {
                    status_updated = changed > 0;
                    if status_updated {
                        info!(order_id = %order_id, station = ?station, "Order fulfilled, status set to paid");
                    }
                }
                Err(e) => {
                    // Completion set stays flipped; no rollback.
                    warn!(order_id = %order_id, error = %e, "Order status update failed");
                }
            }
        }
    }

    Ok(serde_json::json!({
        "success": true,
        "completed": now_complete,
        "all_complete": all_complete,
        "status_updated": status_updated,
    }))
}

// ---------------------------------------------------------------------------
// Order age (kitchen urgency display)
// ---------------------------------------------------------------------------

fn order_age_minutes(created_at: &str, now: DateTime<Utc>) -> i64 {
    DateTime::parse_from_rfc3339(created_at)
        .map(|t| (now - t.with_timezone(&Utc)).num_minutes().max(0))
        .unwrap_or(0)
}

/// Visual urgency band for a pending order. Display only.
pub fn order_age_band(created_at: &str, now: DateTime<Utc>) -> &'static str {
    match order_age_minutes(created_at, now) {
        m if m < 5 => "fresh",
        m if m < 10 => "aging",
        m if m < 15 => "urgent",
        _ => "critical",
    }
}

/// Spanish age label shown next to pending lines.
pub fn order_age_text(created_at: &str, now: DateTime<Utc>) -> String {
    match order_age_minutes(created_at, now) {
        0 => "Ahora mismo".to_string(),
        1 => "Hace 1 minuto".to_string(),
        m => format!("Hace {m} minutos"),
    }
}

// ---------------------------------------------------------------------------
// Maintenance
// ---------------------------------------------------------------------------

/// Wipe all orders and line items, reset employee counters, and clear the
/// completion set (operations view).
pub fn clear_all_orders(db: &DbState, completion: &CompletionState) -> PosResult<Value> {
    let conn = db
        .conn
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;
    conn.execute_batch("BEGIN IMMEDIATE")
        .map_err(|e| PosError::Database(format!("begin transaction: {e}")))?;

    let result = (|| -> PosResult<()> {
        conn.execute("DELETE FROM order_items", [])?;
        conn.execute("DELETE FROM orders", [])?;
        conn.execute(
            "UPDATE employees SET total_orders = 0, total_sales = 0, cash_in_drawer = 0,
                                  updated_at = datetime('now')",
            [],
        )?;
        Ok(())
    })();

    match result {
        Ok(()) => {
            conn.execute_batch("COMMIT")
                .map_err(|e| PosError::Database(format!("commit: {e}")))?;
        }
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            return Err(e);
        }
    }
    drop(conn);

    completion.clear();
    info!("All orders cleared and employee counters reset");
    Ok(serde_json::json!({ "success": true }))
}

/// Count of pending orders belonging to an employee (end-of-shift guard).
pub fn pending_order_count(db: &DbState, employee_id: &str) -> PosResult<i64> {
    let conn = db
        .conn
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;
    let count = conn.query_row(
        "SELECT COUNT(*) FROM orders WHERE employee_id = ?1 AND status = 'pending'",
        params![employee_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chrono::Duration;
    use rusqlite::Connection;

    fn test_db() -> DbState {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        db::run_migrations_for_test(&conn);
        DbState {
            conn: std::sync::Mutex::new(conn),
            db_path: std::path::PathBuf::from(":memory:"),
        }
    }

    fn insert_menu_item(db: &DbState, id: &str, name: &str, category: &str, price: f64) {
        let conn = db.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO menu_items (id, name, category, price) VALUES (?1, ?2, ?3, ?4)",
            params![id, name, category, price],
        )
        .unwrap();
    }

    fn dispatch(id: &str, qty: i64, price: f64) -> DispatchItem {
        DispatchItem {
            menu_item_id: id.to_string(),
            quantity: qty,
            price,
        }
    }

    #[test]
    fn test_create_order_with_items_atomic() {
        let db = test_db();
        insert_menu_item(&db, "fries", "Lelouch Fries", "Food", 8.0);

        let order = create_order_with_items(
            &db,
            "Customer 1",
            3,
            "emp-1",
            &[dispatch("fries", 2, 8.0)],
        )
        .expect("create");
        assert_eq!(order["status"], "pending");

        let conn = db.conn.lock().unwrap();
        let item_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM order_items", [], |row| row.get(0))
            .unwrap();
        assert_eq!(item_count, 1);
    }

    #[test]
    fn test_create_order_rolls_back_on_bad_item() {
        let db = test_db();
        // quantity 0 violates the CHECK constraint on order_items
        let err = create_order_with_items(&db, "Customer 1", 1, "emp-1", &[dispatch("x", 0, 1.0)]);
        assert!(err.is_err());

        let conn = db.conn.lock().unwrap();
        let order_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))
            .unwrap();
        assert_eq!(order_count, 0, "failed dispatch must leave no order row");
    }

    #[test]
    fn test_create_order_rejects_empty_items() {
        let db = test_db();
        let err = create_order_with_items(&db, "Customer 1", 1, "emp-1", &[]).unwrap_err();
        assert_eq!(err.to_string(), "Order has no items");
    }

    #[test]
    fn test_station_filtering() {
        let db = test_db();
        let completion = CompletionState::new();
        insert_menu_item(&db, "fries", "Lelouch Fries", "Food", 8.0);
        insert_menu_item(&db, "beer", "Draft Beer", "Beer", 5.0);

        create_order_with_items(&db, "Ana", 1, "emp-1", &[dispatch("fries", 1, 8.0)]).unwrap();
        create_order_with_items(&db, "Ana", 1, "emp-1", &[dispatch("beer", 1, 5.0)]).unwrap();

        let kitchen = list_station_orders(&db, &completion, Station::Kitchen).unwrap();
        assert_eq!(kitchen["pending_count"], 1);
        let bar = list_station_orders(&db, &completion, Station::Bar).unwrap();
        assert_eq!(bar["pending_count"], 1);
    }

    #[test]
    fn test_pending_grouped_by_customer_sorted() {
        let db = test_db();
        let completion = CompletionState::new();
        insert_menu_item(&db, "fries", "Lelouch Fries", "Food", 8.0);

        create_order_with_items(&db, "Zoe", 1, "emp-1", &[dispatch("fries", 1, 8.0)]).unwrap();
        create_order_with_items(&db, "Ana", 2, "emp-1", &[dispatch("fries", 1, 8.0)]).unwrap();
        create_order_with_items(&db, "Zoe", 1, "emp-1", &[dispatch("fries", 2, 8.0)]).unwrap();

        let board = list_station_orders(&db, &completion, Station::Kitchen).unwrap();
        let groups = board["pending"].as_array().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0]["customer_name"], "Ana");
        assert_eq!(groups[1]["customer_name"], "Zoe");
        assert_eq!(groups[1]["orders"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_order_paid_only_when_all_station_items_complete() {
        let db = test_db();
        let completion = CompletionState::new();
        insert_menu_item(&db, "fries", "Lelouch Fries", "Food", 8.0);
        insert_menu_item(&db, "tapas", "Tapas Mixtas", "Food", 11.0);

        let order = create_order_with_items(
            &db,
            "Ana",
            1,
            "emp-1",
            &[dispatch("fries", 1, 8.0), dispatch("tapas", 1, 11.0)],
        )
        .unwrap();
        let order_id = order["id"].as_str().unwrap();

        // First item complete: order stays pending
        let r1 =
            toggle_item_complete(&db, &completion, Station::Kitchen, order_id, "fries").unwrap();
        assert_eq!(r1["completed"], true);
        assert_eq!(r1["all_complete"], false);
        assert_eq!(r1["status_updated"], false);

        // Second item complete: order flips to paid exactly once
        let r2 =
            toggle_item_complete(&db, &completion, Station::Kitchen, order_id, "tapas").unwrap();
        assert_eq!(r2["all_complete"], true);
        assert_eq!(r2["status_updated"], true);

        let conn = db.conn.lock().unwrap();
        let status: String = conn
            .query_row("SELECT status FROM orders WHERE id = ?1", params![order_id], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(status, "paid");
        drop(conn);

        // Board shows it in the paid history, not pending
        let board = list_station_orders(&db, &completion, Station::Kitchen).unwrap();
        assert_eq!(board["pending_count"], 0);
        assert_eq!(board["paid"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_paid_transition_fires_exactly_once() {
        let db = test_db();
        let completion = CompletionState::new();
        insert_menu_item(&db, "beer", "Draft Beer", "Beer", 5.0);

        let order =
            create_order_with_items(&db, "Ana", 1, "emp-1", &[dispatch("beer", 2, 5.0)]).unwrap();
        let order_id = order["id"].as_str().unwrap();

        let r1 = toggle_item_complete(&db, &completion, Station::Bar, order_id, "beer").unwrap();
        assert_eq!(r1["status_updated"], true);

        // Toggle off then on again: order is already paid, guard prevents a
        // second transition
        toggle_item_complete(&db, &completion, Station::Bar, order_id, "beer").unwrap();
        let r3 = toggle_item_complete(&db, &completion, Station::Bar, order_id, "beer").unwrap();
        assert_eq!(r3["all_complete"], true);
        assert_eq!(r3["status_updated"], false);
    }

    #[test]
    fn test_toggle_off_keeps_order_pending() {
        let db = test_db();
        let completion = CompletionState::new();
        insert_menu_item(&db, "beer", "Draft Beer", "Beer", 5.0);
        insert_menu_item(&db, "wine", "House Red Wine", "Wine", 7.0);

        let order = create_order_with_items(
            &db,
            "Ana",
            1,
            "emp-1",
            &[dispatch("beer", 1, 5.0), dispatch("wine", 1, 7.0)],
        )
        .unwrap();
        let order_id = order["id"].as_str().unwrap();

        toggle_item_complete(&db, &completion, Station::Bar, order_id, "beer").unwrap();
        let off = toggle_item_complete(&db, &completion, Station::Bar, order_id, "beer").unwrap();
        assert_eq!(off["completed"], false);
        assert!(!completion.is_complete(order_id, "beer"));
    }

    #[test]
    fn test_age_bands() {
        let now = Utc::now();
        let at = |mins: i64| (now - Duration::minutes(mins)).to_rfc3339();
        assert_eq!(order_age_band(&at(0), now), "fresh");
        assert_eq!(order_age_band(&at(4), now), "fresh");
        assert_eq!(order_age_band(&at(7), now), "aging");
        assert_eq!(order_age_band(&at(12), now), "urgent");
        assert_eq!(order_age_band(&at(20), now), "critical");
        assert_eq!(order_age_text(&at(0), now), "Ahora mismo");
        assert_eq!(order_age_text(&at(1), now), "Hace 1 minuto");
        assert_eq!(order_age_text(&at(9), now), "Hace 9 minutos");
    }

    #[test]
    fn test_clear_all_orders() {
        let db = test_db();
        let completion = CompletionState::new();
        insert_menu_item(&db, "beer", "Draft Beer", "Beer", 5.0);
        let order =
            create_order_with_items(&db, "Ana", 1, "emp-1", &[dispatch("beer", 1, 5.0)]).unwrap();
        toggle_item_complete(
            &db,
            &completion,
            Station::Bar,
            order["id"].as_str().unwrap(),
            "beer",
        )
        .unwrap();

        let conn = db.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO employees (id, name, code_hash, total_orders, total_sales, cash_in_drawer, created_at, updated_at)
             VALUES ('emp-1', 'Maria', 'hash', 5, 120.0, 300.0, datetime('now'), datetime('now'))",
            [],
        )
        .unwrap();
        drop(conn);

        clear_all_orders(&db, &completion).unwrap();

        let conn = db.conn.lock().unwrap();
        let orders: i64 = conn
            .query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orders, 0);
        let (total_orders, total_sales, cash): (i64, f64, f64) = conn
            .query_row(
                "SELECT total_orders, total_sales, cash_in_drawer FROM employees WHERE id = 'emp-1'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(total_orders, 0);
        assert_eq!(total_sales, 0.0);
        assert_eq!(cash, 0.0);
        assert!(!completion.is_complete(order["id"].as_str().unwrap(), "beer"));
    }

    #[test]
    fn test_pending_order_count() {
        let db = test_db();
        insert_menu_item(&db, "beer", "Draft Beer", "Beer", 5.0);
        create_order_with_items(&db, "Ana", 1, "emp-1", &[dispatch("beer", 1, 5.0)]).unwrap();
        create_order_with_items(&db, "Ana", 1, "emp-2", &[dispatch("beer", 1, 5.0)]).unwrap();

        assert_eq!(pending_order_count(&db, "emp-1").unwrap(), 1);
        assert_eq!(pending_order_count(&db, "emp-3").unwrap(), 0);
    }
}
