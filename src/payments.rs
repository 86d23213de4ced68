//! Tab settlement for OTAKU POS.
//!
//! Settling a tab computes its derived totals, writes the immutable receipt
//! row, and applies the employee's shift counters. Receipt insert and
//! counter update share one transaction so a failure leaves no partial
//! state. Cash settlements validate the amount received and report the
//! change to hand back; the change itself is never persisted.

use chrono::Utc;
use rusqlite::params;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::db::DbState;
use crate::error::{PosError, PosResult};
use crate::menu;
use crate::shifts;
use crate::tabs::TabState;
use crate::totals::{self, round2};

/// Settle the tab and close it.
///
/// Payload: `{ tab_id, method: "cash"|"card", discount_percent?,
/// amount_received? }`. `amount_received` is required for cash.
pub fn settle_tab(
    db: &DbState,
    tabs: &TabState,
    employee_id: Option<&str>,
    payload: &Value,
) -> PosResult<Value> {
    let employee_id = match employee_id {
        Some(id) if !id.trim().is_empty() => id.to_string(),
        _ => return Err(PosError::validation("Please log in to take payments")),
    };
    if !shifts::shift_is_active(db, &employee_id)? {
        return Err(PosError::validation(
            "No active shift. Please start a shift first.",
        ));
    }

    let tab_id = crate::value_str(payload, &["tab_id", "tabId", "id"])
        .ok_or_else(|| PosError::validation("Missing tab_id"))?;
    let tab = tabs
        .get(&tab_id)
        .ok_or_else(|| PosError::validation("Tab not found"))?;
    if tab.items.is_empty() {
        return Err(PosError::validation("Please add items to the order"));
    }

    let method = crate::value_str(payload, &["method", "payment_method", "paymentMethod"])
        .unwrap_or_default();
    if method != "cash" && method != "card" {
        return Err(PosError::validation(format!(
            "Invalid payment method: {method}"
        )));
    }

    let discount_percent =
        crate::value_f64(payload, &["discount_percent", "discountPercent", "discount"])
            .unwrap_or(0.0);

    let catalog = menu::load_menu_items(db)?;
    let tab_totals = totals::calculate_tab_totals(&tab.items, &catalog, discount_percent);

    // Cash handling: received must cover the total; change is display-only.
    let (cash_received, change) = if method == "cash" {
        let received = crate::value_f64(payload, &["amount_received", "amountReceived"])
            .ok_or_else(|| PosError::validation("Por favor ingrese un monto válido"))?;
        if !received.is_finite() {
            return Err(PosError::validation("Por favor ingrese un monto válido"));
        }
        if received < tab_totals.total {
            return Err(PosError::validation(
                "El monto recibido debe ser mayor o igual al total",
            ));
        }
        (Some(received), Some(received - tab_totals.total))
    } else {
        (None, None)
    };

    let receipt_id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    let conn = db
        .conn
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;
    conn.execute_batch("BEGIN IMMEDIATE")
        .map_err(|e| PosError::Database(format!("begin transaction: {e}")))?;

    let result = (|| -> PosResult<()> {
        conn.execute(
            "INSERT INTO receipts (
                id, customer_name, table_number, subtotal, itbis, tip, total,
                payment_method, is_fiscal, fiscal_number, employee_id, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                receipt_id,
                tab.customer_name,
                tab.table_number,
                tab_totals.subtotal,
                tab_totals.itbis,
                tab_totals.tip,
                tab_totals.total,
                method,
                tab.is_fiscal as i64,
                tab.fiscal_number,
                employee_id,
                now,
            ],
        )?;

        shifts::record_sale(&conn, &employee_id, tab_totals.total, cash_received)?;
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

    // Tab is done once payment lands.
    crate::tabs::close_tab(tabs, &tab_id)?;

    info!(
        receipt_id = %receipt_id,
        method = %method,
        total = %round2(tab_totals.total),
        "Tab settled"
    );

    Ok(serde_json::json!({
        "success": true,
        "receipt_id": receipt_id,
        "receipt": {
            "id": receipt_id,
            "customer_name": tab.customer_name,
            "table_number": tab.table_number,
            "subtotal": tab_totals.subtotal,
            "discount_percent": tab_totals.discount_percent,
            "discount_amount": tab_totals.discount_amount,
            "itbis": tab_totals.itbis,
            "tip": tab_totals.tip,
            "total": tab_totals.total,
            "payment_method": method,
            "is_fiscal": tab.is_fiscal,
            "fiscal_number": tab.fiscal_number,
            "employee_id": employee_id,
            "created_at": now,
        },
        "cash_received": cash_received,
        "change": change.map(round2),
        "missing_items": tab_totals.missing_items,
    }))
}

/// Receipts for the history views, newest first, optionally scoped to one
/// employee and a start date (RFC 3339).
pub fn list_receipts(
    db: &DbState,
    employee_id: Option<&str>,
    since: Option<&str>,
) -> PosResult<Value> {
    let conn = db
        .conn
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;
    let mut stmt = conn.prepare(
        "SELECT id, customer_name, table_number, subtotal, itbis, tip, total,
                payment_method, is_fiscal, fiscal_number, employee_id, created_at
         FROM receipts
         WHERE (?1 IS NULL OR employee_id = ?1)
           AND (?2 IS NULL OR created_at >= ?2)
         ORDER BY created_at DESC",
    )?;
    let rows = stmt.query_map(params![employee_id, since], |row| {
        Ok(serde_json::json!({
            "id": row.get::<_, String>(0)?,
            "customer_name": row.get::<_, String>(1)?,
            "table_number": row.get::<_, i64>(2)?,
            "subtotal": row.get::<_, f64>(3)?,
            "itbis": row.get::<_, f64>(4)?,
            "tip": row.get::<_, f64>(5)?,
            "total": row.get::<_, f64>(6)?,
            "payment_method": row.get::<_, String>(7)?,
            "is_fiscal": row.get::<_, i64>(8)? != 0,
            "fiscal_number": row.get::<_, Option<String>>(9)?,
            "employee_id": row.get::<_, Option<String>>(10)?,
            "created_at": row.get::<_, String>(11)?,
        }))
    })?;
    let receipts: Vec<Value> = rows.filter_map(|r| r.ok()).collect();
    Ok(Value::Array(receipts))
}

// ---------------------------------------------------------------------------
// Receipt preview
// ---------------------------------------------------------------------------

/// Printable/emailable rendering of an open tab at the given discount.
/// Used for the pre-payment preview and the post-payment receipt modal.
pub fn tab_receipt_preview(
    db: &DbState,
    tabs: &TabState,
    tab_id: &str,
    discount_percent: f64,
    payment_method: Option<&str>,
) -> PosResult<Value> {
    let tab = tabs
        .get(tab_id)
        .ok_or_else(|| PosError::validation("Tab not found"))?;
    let catalog = menu::load_menu_items(db)?;
    let tab_totals = totals::calculate_tab_totals(&tab.items, &catalog, discount_percent);

    let entries: Vec<(String, i64, f64)> = tab
        .items
        .iter()
        .filter_map(|item| {
            catalog
                .iter()
                .find(|m| m.id == item.item_id)
                .map(|m| (m.name.clone(), item.quantity, m.price))
        })
        .collect();

    let receipt = crate::receipt_renderer::ReceiptData {
        customer_name: tab.customer_name.clone(),
        table_number: tab.table_number,
        is_fiscal: tab.is_fiscal,
        fiscal_number: tab.fiscal_number.clone(),
        lines: crate::receipt_renderer::group_lines(&entries),
        subtotal: tab_totals.subtotal,
        discount_percent: tab_totals.discount_percent,
        discount_amount: tab_totals.discount_amount,
        itbis: tab_totals.itbis,
        tip: tab_totals.tip,
        total: tab_totals.total,
        payment_method: payment_method.map(str::to_string),
        created_at: Utc::now().to_rfc3339(),
    };

    let business = {
        let conn = db
            .conn
            .lock()
            .map_err(|e| PosError::Database(e.to_string()))?;
        crate::receipt_renderer::BusinessInfo::from_settings(&conn)
    };

    Ok(serde_json::json!({
        "success": true,
        "html": crate::receipt_renderer::render_receipt_html(&business, &receipt),
        "email_body": crate::receipt_renderer::render_email_body(&business, &receipt),
        "totals": {
            "subtotal": receipt.subtotal,
            "discount_amount": receipt.discount_amount,
            "itbis": receipt.itbis,
            "tip": receipt.tip,
            "total": receipt.total,
        },
        "missing_items": tab_totals.missing_items,
    }))
}

// ===========================================================================
// Tests
// ===========================================================================
