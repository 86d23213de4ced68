//! Shift and cash-drawer tracking for OTAKU POS.
//!
//! A shift is a tracked work session per employee: it starts with the cash
//! drawer's opening amount, accumulates order/sales/cash counters with every
//! settled payment, and can only end once the employee has no pending
//! orders on the fulfillment boards.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde_json::Value;
use tracing::info;

use crate::db::DbState;
use crate::error::{PosError, PosResult};
use crate::orders;

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Employee row as JSON (code hash excluded).
pub fn get_employee(db: &DbState, employee_id: &str) -> PosResult<Option<Value>> {
    let conn = db
        .conn
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;
    Ok(employee_json(&conn, employee_id))
}

fn employee_json(conn: &Connection, employee_id: &str) -> Option<Value> {
    conn.query_row(
        "SELECT id, name, shift_status, shift_start_time, total_orders, total_sales, cash_in_drawer
         FROM employees WHERE id = ?1",
        params![employee_id],
        |row| {
            Ok(serde_json::json!({
                "id": row.get::<_, String>(0)?,
                "name": row.get::<_, String>(1)?,
                "shift_status": row.get::<_, String>(2)?,
                "shift_start_time": row.get::<_, Option<String>>(3)?,
                "total_orders": row.get::<_, i64>(4)?,
                "total_sales": row.get::<_, f64>(5)?,
                "cash_in_drawer": row.get::<_, f64>(6)?,
            }))
        },
    )
    .ok()
}

/// Whether the employee currently has an active shift.
pub fn shift_is_active(db: &DbState, employee_id: &str) -> PosResult<bool> {
    let conn = db
        .conn
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;
    let status: Option<String> = conn
        .query_row(
            "SELECT shift_status FROM employees WHERE id = ?1",
            params![employee_id],
            |row| row.get(0),
        )
        .ok();
    Ok(status.as_deref() == Some("active"))
}

// ---------------------------------------------------------------------------
// Start / end
// ---------------------------------------------------------------------------

/// Start a shift with the drawer's opening amount.
pub fn start_shift(db: &DbState, employee_id: &str, opening_cash: f64) -> PosResult<Value> {
    if !opening_cash.is_finite() || opening_cash < 0.0 {
        return Err(PosError::validation("Por favor ingrese un monto válido"));
    }

    let conn = db
        .conn
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;

    let status: String = conn
        .query_row(
            "SELECT shift_status FROM employees WHERE id = ?1",
            params![employee_id],
            |row| row.get(0),
        )
        .map_err(|_| PosError::validation("Employee not found"))?;
    if status == "active" {
        return Err(PosError::validation("Shift is already active"));
    }

    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE employees SET
            shift_status = 'active',
            shift_start_time = ?1,
            cash_in_drawer = ?2,
            updated_at = ?1
         WHERE id = ?3",
        params![now, opening_cash, employee_id],
    )?;

    info!(employee_id = %employee_id, opening_cash = %opening_cash, "Shift started");
    Ok(serde_json::json!({
        "success": true,
        "employee": employee_json(&conn, employee_id),
    }))
}

/// End a shift. Refused while the employee has pending orders; this is
/// the one hard guard tying the POS to the fulfillment boards.
pub fn end_shift(db: &DbState, employee_id: &str) -> PosResult<Value> {
    let pending = orders::pending_order_count(db, employee_id)?;
    if pending > 0 {
        return Err(PosError::validation(
            "Por favor complete o elimine todas las órdenes pendientes antes de finalizar su turno.",
        ));
    }

    let conn = db
        .conn
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;

    let status: String = conn
        .query_row(
            "SELECT shift_status FROM employees WHERE id = ?1",
            params![employee_id],
            |row| row.get(0),
        )
        .map_err(|_| PosError::validation("Employee not found"))?;
    if status != "active" {
        return Err(PosError::validation("No active shift to end"));
    }

    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE employees SET
            shift_status = 'inactive',
            shift_start_time = NULL,
            total_orders = 0,
            total_sales = 0,
            cash_in_drawer = 0,
            updated_at = ?1
         WHERE id = ?2",
        params![now, employee_id],
    )?;

    info!(employee_id = %employee_id, "Shift ended");
    Ok(serde_json::json!({ "success": true }))
}

/// Summary shown in the end-of-shift modal: duration, counters, pending
/// orders still blocking checkout.
pub fn shift_summary(db: &DbState, employee_id: &str) -> PosResult<Value> {
    let pending = orders::pending_order_count(db, employee_id)?;

    let conn = db
        .conn
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;
    let employee =
        employee_json(&conn, employee_id).ok_or_else(|| PosError::validation("Employee not found"))?;

    let duration_minutes = employee["shift_start_time"]
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|start| (Utc::now() - start.with_timezone(&Utc)).num_minutes().max(0))
        .unwrap_or(0);

    Ok(serde_json::json!({
        "employee": employee,
        "duration_minutes": duration_minutes,
        "pending_orders": pending,
        "can_end_shift": pending == 0,
    }))
}

// ---------------------------------------------------------------------------
// Payment-side counters
// ---------------------------------------------------------------------------

/// Apply a settled payment to the employee's running totals. Runs on the
/// caller's connection so settlement can keep it inside one transaction.
/// Cash settlements add the amount physically received to the drawer.
pub fn record_sale(
    conn: &Connection,
    employee_id: &str,
    total: f64,
    cash_received: Option<f64>,
) -> PosResult<()> {
    let now = Utc::now().to_rfc3339();
    let changed = conn.execute(
        "UPDATE employees SET
            total_orders = total_orders + 1,
            total_sales = total_sales + ?1,
            cash_in_drawer = cash_in_drawer + ?2,
            updated_at = ?3
         WHERE id = ?4",
        params![total, cash_received.unwrap_or(0.0), now, employee_id],
    )?;
    if changed == 0 {
        return Err(PosError::validation("Employee not found"));
    }
    Ok(())
}

// ===========================================================================
// Tests
// ===========================================================================
