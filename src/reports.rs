//! Sales history and DGII tax reports for OTAKU POS.
//!
//! Settled receipts are the basis for the sales overview (daily summaries,
//! payment mix, weekday/hourly breakdowns) while paid orders provide the
//! per-item counts. The 606 (purchases) and 607 (sales) exports reproduce
//! the legacy DGII declaration layouts (column order, `AAAAMM`/`D` date
//! split, header block) so the files keep working with the existing
//! filing tooling.

use chrono::{Datelike, Duration, NaiveDate, Timelike, Utc};
use rusqlite::params;
use serde_json::Value;
use tracing::info;

use crate::db::DbState;
use crate::error::{PosError, PosResult};
use crate::totals::round2;

/// Company identity on report headers.
const COMPANY_NAME: &str = "One Piece Bar & Tapas";
const COMPANY_RNC: &str = "132868226";

/// Spanish weekday names, Sunday first.
const DAYS_OF_WEEK: &[&str] = &[
    "Domingo",
    "Lunes",
    "Martes",
    "Miércoles",
    "Jueves",
    "Viernes",
    "Sábado",
];

// ---------------------------------------------------------------------------
// Sales history
// ---------------------------------------------------------------------------

struct ReceiptRow {
    subtotal: f64,
    itbis: f64,
    tip: f64,
    total: f64,
    payment_method: String,
    is_fiscal: bool,
    fiscal_number: Option<String>,
    created_at: String,
}

fn load_receipts(db: &DbState, employee_id: Option<&str>, since: Option<&str>) -> PosResult<Vec<ReceiptRow>> {
    let conn = db
        .conn
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;
    let mut stmt = conn.prepare(
        "SELECT subtotal, itbis, tip, total, payment_method, is_fiscal, fiscal_number, created_at
         FROM receipts
         WHERE (?1 IS NULL OR employee_id = ?1)
           AND (?2 IS NULL OR created_at >= ?2)
         ORDER BY created_at DESC",
    )?;
    let rows = stmt.query_map(params![employee_id, since], |row| {
        Ok(ReceiptRow {
            subtotal: row.get(0)?,
            itbis: row.get(1)?,
            tip: row.get(2)?,
            total: row.get(3)?,
            payment_method: row.get(4)?,
            is_fiscal: row.get::<_, i64>(5)? != 0,
            fiscal_number: row.get(6)?,
            created_at: row.get(7)?,
        })
    })?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

/// Sales overview for an employee over the last week or month.
pub fn sales_history(db: &DbState, employee_id: Option<&str>, timeframe: &str) -> PosResult<Value> {
    let days = match timeframe {
        "month" => 30,
        _ => 7,
    };
    let since = (Utc::now() - Duration::days(days)).to_rfc3339();
    let receipts = load_receipts(db, employee_id, Some(&since))?;

    // Per-day summaries
    let mut daily: Vec<(String, f64, i64)> = Vec::new();
    for receipt in &receipts {
        let date = receipt.created_at.chars().take(10).collect::<String>();
        match daily.iter_mut().find(|(d, _, _)| d == &date) {
            Some((_, sales, orders)) => {
                *sales += receipt.total;
                *orders += 1;
            }
            None => daily.push((date, receipt.total, 1)),
        }
    }
    daily.sort_by(|(a, _, _), (b, _, _)| a.cmp(b));
    let daily_json: Vec<Value> = daily
        .iter()
        .map(|(date, sales, orders)| {
            serde_json::json!({
                "date": date,
                "total_sales": sales,
                "total_orders": orders,
                "avg_order_value": if *orders > 0 { sales / *orders as f64 } else { 0.0 },
            })
        })
        .collect();

    // Payment method distribution
    let cash_count = receipts
        .iter()
        .filter(|r| r.payment_method == "cash")
        .count();
    let card_count = receipts.len() - cash_count;

    // Sales by day of week and by hour
    let mut weekday_sales = [0.0f64; 7];
    let mut hourly_sales = [0.0f64; 24];
    for receipt in &receipts {
        if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(&receipt.created_at) {
            let weekday = ts.weekday().num_days_from_sunday() as usize;
            weekday_sales[weekday] += receipt.total;
            hourly_sales[ts.hour() as usize] += receipt.total;
        }
    }
    let weekday_json: Vec<Value> = DAYS_OF_WEEK
        .iter()
        .enumerate()
        .filter(|(i, _)| weekday_sales[*i] > 0.0)
        .map(|(i, day)| serde_json::json!({ "day": day, "sales": weekday_sales[i] }))
        .collect();
    let hourly_json: Vec<Value> = (0..24)
        .filter(|h| hourly_sales[*h] > 0.0)
        .map(|h| serde_json::json!({ "hour": h, "sales": hourly_sales[h] }))
        .collect();

    // Top items come from paid orders (receipts carry no lines)
    let top_items = top_items(db, employee_id, &since)?;

    let total_sales: f64 = receipts.iter().map(|r| r.total).sum();
    Ok(serde_json::json!({
        "timeframe": timeframe,
        "total_sales": total_sales,
        "total_orders": receipts.len(),
        "daily": daily_json,
        "top_items": top_items,
        "payment_methods": { "cash": cash_count, "card": card_count },
        "day_of_week": weekday_json,
        "hourly": hourly_json,
    }))
}

/// Top 5 items by quantity across paid orders since the given timestamp.
fn top_items(db: &DbState, employee_id: Option<&str>, since: &str) -> PosResult<Vec<Value>> {
    let conn = db
        .conn
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;
    let mut stmt = conn.prepare(
        "SELECT m.name, SUM(oi.quantity) AS qty
         FROM orders o
         JOIN order_items oi ON oi.order_id = o.id
         JOIN menu_items m ON m.id = oi.menu_item_id
         WHERE o.status = 'paid'
           AND o.created_at >= ?1
           AND (?2 IS NULL OR o.employee_id = ?2)
         GROUP BY m.name
         ORDER BY qty DESC, m.name ASC
         LIMIT 5",
    )?;
    let rows = stmt.query_map(params![since, employee_id], |row| {
        Ok(serde_json::json!({
            "name": row.get::<_, String>(0)?,
            "qty": row.get::<_, i64>(1)?,
        }))
    })?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

// ---------------------------------------------------------------------------
// DGII date helpers
// ---------------------------------------------------------------------------

/// Split an ISO date (or RFC 3339 timestamp) into the DGII `AAAAMM` and `D`
/// encodings. Unparseable dates fall back to empty fields.
fn split_dgii_date(value: &str) -> (String, String) {
    let date_part: String = value.chars().take(10).collect();
    match NaiveDate::parse_from_str(&date_part, "%Y-%m-%d") {
        Ok(date) => (
            format!("{}{:02}", date.year(), date.month()),
            format!("{:02}", date.day()),
        ),
        Err(_) => (String::new(), String::new()),
    }
}

fn month_bounds(period: &str) -> PosResult<(String, String)> {
    let mut parts = period.split('-');
    let year: i32 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(|| PosError::validation("Invalid period, expected YYYY-MM"))?;
    let month: u32 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .filter(|m| (1..=12).contains(m))
        .ok_or_else(|| PosError::validation("Invalid period, expected YYYY-MM"))?;
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| PosError::validation("Invalid period, expected YYYY-MM"))?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| PosError::validation("Invalid period, expected YYYY-MM"))?;
    Ok((start.to_string(), end.to_string()))
}

// ---------------------------------------------------------------------------
// 607: sales declaration
// ---------------------------------------------------------------------------

const REPORT_607_COLUMNS: &[&str] = &[
    "RNC",
    "Tipo ID",
    "NCF",
    "NCF Modificado",
    "Fecha Comprobante (YYYYMM)",
    "Fecha Comprobante (DD)",
    "Fecha Pago (YYYYMM)",
    "Fecha Pago (DD)",
    "Monto Facturado Servicios",
    "Monto Facturado Bienes",
    "Total Monto Facturado",
    "ITBIS Facturado",
    "ITBIS Retenido",
    "ITBIS Sujeto a Proporcionalidad",
    "ITBIS Llevado al Costo",
    "ITBIS por Adelantar",
    "ITBIS Percibido en Compras",
    "Tipo de Retención ISR",
    "Monto Retención Renta",
    "ISR Percibido en Compras",
    "Impuesto Selectivo al Consumo",
    "Otros Impuestos/Tasas",
    "Monto Propina Legal",
    "Forma de Pago",
];

/// Generate the monthly 607 sales declaration from settled receipts.
///
/// Fiscal receipts in the period are preferred; the filter widens (all
/// fiscal, then all in period, then the most recent receipt) so a report is
/// produced whenever any sale exists.
pub fn generate_report_607(db: &DbState, period: &str) -> PosResult<Value> {
    let (month_start, month_end) = month_bounds(period)?;
    let all = load_receipts(db, None, None)?;

    let in_period = |r: &&ReceiptRow| {
        let date: String = r.created_at.chars().take(10).collect();
        date.as_str() >= month_start.as_str() && date.as_str() < month_end.as_str()
    };

    let mut filtered: Vec<&ReceiptRow> = all.iter().filter(|r| r.is_fiscal).filter(in_period).collect();
    if filtered.is_empty() {
        filtered = all.iter().filter(|r| r.is_fiscal).collect();
    }
    if filtered.is_empty() {
        filtered = all.iter().filter(in_period).collect();
    }
    if filtered.is_empty() {
        filtered = all.iter().take(1).collect();
    }
    if filtered.is_empty() {
        return Err(PosError::validation(
            "No hay órdenes para generar el reporte. Por favor realice al menos una venta.",
        ));
    }

    let data_rows: Vec<String> = filtered
        .iter()
        .map(|receipt| {
            let (year_month, day) = split_dgii_date(&receipt.created_at);
            // Restaurant sales are declared as services
            let monto_servicios = format!("{:.2}", round2(receipt.subtotal));
            vec![
                receipt
                    .fiscal_number
                    .clone()
                    .unwrap_or_else(|| COMPANY_RNC.to_string()),
                "1".to_string(),
                receipt
                    .fiscal_number
                    .clone()
                    .unwrap_or_else(|| "B0100000000".to_string()),
                String::new(),
                year_month.clone(),
                day.clone(),
                year_month,
                day,
                monto_servicios.clone(),
                "0.00".to_string(),
                monto_servicios,
                format!("{:.2}", round2(receipt.itbis)),
                "0.00".to_string(),
                "0.00".to_string(),
                "0.00".to_string(),
                format!("{:.2}", round2(receipt.itbis)),
                "0.00".to_string(),
                String::new(),
                "0.00".to_string(),
                "0.00".to_string(),
                "0.00".to_string(),
                "0.00".to_string(),
                format!("{:.2}", round2(receipt.tip)),
                if receipt.payment_method == "cash" { "01" } else { "02" }.to_string(),
            ]
            .join(",")
        })
        .collect();

    let total_facturado: f64 = filtered.iter().map(|r| r.total).sum();
    let compact_period = period.replace('-', "");
    let file_header = [
        format!("Reporte 607 generado para {COMPANY_NAME}"),
        format!("RNC: {COMPANY_RNC}"),
        format!("Período: {compact_period}"),
        format!("Cantidad de registros: {}", filtered.len()),
        format!("Total monto facturado: {:.2}", total_facturado),
        String::new(),
    ]
    .join("\n");

    let content = format!(
        "{file_header}\n{}\n{}",
        REPORT_607_COLUMNS.join(","),
        data_rows.join("\n")
    );

    info!(period = %period, records = filtered.len(), "Generated 607 report");
    Ok(serde_json::json!({
        "success": true,
        "filename": format!("Reporte_607_{compact_period}.csv"),
        "records": filtered.len(),
        "content": content,
    }))
}

// ---------------------------------------------------------------------------
// 606: purchases declaration
// ---------------------------------------------------------------------------

const REPORT_606_COLUMNS: &[&str] = &[
    "Número línea",
    "RNC/Cedula",
    "Tipo de identificación",
    "Tipo de bienes y servicios comprados",
    "NCF",
    "NCF ó documento modificado",
    "Fecha de comprobante (AAAAMM)",
    "Fecha de comprobante (D)",
    "Fecha de pago (AAAAMM)",
    "Fecha de pago (D)",
    "Monto facturado en servicios",
    "Monto facturado en bienes",
    "Total monto facturado",
    "ITBIS facturado",
    "ITBIS retenido",
    "ITBIS sujeto a proporcionalidad",
    "ITBIS llevado al costo",
    "ITBIS por adelantar",
    "ITBIS percibido en compras",
    "Tipo de retención en ISR",
    "Monto retención renta",
    "ISR percibido en compras",
    "Impuesto selectivo al consumo",
    "Otros impuestos/tasas",
    "Monto propina legal",
    "Forma de pago",
];

struct ExpenseRow {
    rnc: Option<String>,
    ncf: Option<String>,
    date: String,
    amount: f64,
    itbis: f64,
    payment_type: Option<String>,
}

/// Expense ledger reads prefer `simple_receipts`; the legacy `expenses`
/// table is the fallback when the new ledger has no rows for the period.
fn load_expenses(db: &DbState, month_start: &str, month_end: &str) -> PosResult<Vec<ExpenseRow>> {
    let conn = db
        .conn
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;

    let mut stmt = conn.prepare(
        "SELECT rnc, ncf, receipt_date, amount, itbis, payment_type
         FROM simple_receipts
         WHERE receipt_date >= ?1 AND receipt_date < ?2
         ORDER BY receipt_date ASC",
    )?;
    let rows = stmt.query_map(params![month_start, month_end], |row| {
        Ok(ExpenseRow {
            rnc: row.get(0)?,
            ncf: row.get(1)?,
            date: row.get(2)?,
            amount: row.get(3)?,
            itbis: row.get(4)?,
            payment_type: row.get(5)?,
        })
    })?;
    let expenses: Vec<ExpenseRow> = rows.filter_map(|r| r.ok()).collect();
    if !expenses.is_empty() {
        return Ok(expenses);
    }

    let mut stmt = conn.prepare(
        "SELECT rnc, ncf, expense_date, amount, itbis, payment_type
         FROM expenses
         WHERE expense_date >= ?1 AND expense_date < ?2
         ORDER BY expense_date ASC",
    )?;
    let rows = stmt.query_map(params![month_start, month_end], |row| {
        Ok(ExpenseRow {
            rnc: row.get(0)?,
            ncf: row.get(1)?,
            date: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            amount: row.get(3)?,
            itbis: row.get(4)?,
            payment_type: row.get(5)?,
        })
    })?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

/// Generate the monthly 606 purchases declaration from the expense ledger.
/// Tab-separated, matching the legacy filing layout.
pub fn generate_report_606(db: &DbState, period: &str) -> PosResult<Value> {
    let (month_start, month_end) = month_bounds(period)?;
    let expenses = load_expenses(db, &month_start, &month_end)?;

    let compact_period = period.replace('-', "");
    let total: f64 = expenses.iter().map(|e| e.amount).sum();

    let header_section = [
        format!("Reporte 606 generado para {COMPANY_NAME}"),
        format!("RNC o Cédula\t{COMPANY_RNC}"),
        format!("Período\t{compact_period}"),
        format!("Cantidad de registros\t{}", expenses.len()),
        format!("Total monto facturado\t{:.2}", total),
        String::new(),
        String::new(),
    ]
    .join("\n");

    let data_rows: Vec<String> = expenses
        .iter()
        .enumerate()
        .map(|(index, expense)| {
            let (year_month, day) = split_dgii_date(&expense.date);
            let goods = (expense.amount - expense.itbis).max(0.0);
            vec![
                (index + 1).to_string(),
                expense.rnc.clone().unwrap_or_default(),
                "1".to_string(),
                "5".to_string(),
                expense.ncf.clone().unwrap_or_default(),
                String::new(),
                year_month.clone(),
                day.clone(),
                year_month,
                day,
                "0.00".to_string(),
                format!("{:.2}", round2(goods)),
                format!("{:.2}", round2(expense.amount)),
                format!("{:.2}", round2(expense.itbis)),
                "0.00".to_string(),
                "0.00".to_string(),
                "0.00".to_string(),
                "0.00".to_string(),
                "0.00".to_string(),
                String::new(),
                "0.00".to_string(),
                "0.00".to_string(),
                "0.00".to_string(),
                "0.00".to_string(),
                "0.00".to_string(),
                expense.payment_type.clone().unwrap_or_else(|| "03".to_string()),
            ]
            .join("\t")
        })
        .collect();

    let content = format!(
        "{header_section}{}\n{}",
        REPORT_606_COLUMNS.join("\t"),
        data_rows.join("\n")
    );

    info!(period = %period, records = expenses.len(), "Generated 606 report");
    Ok(serde_json::json!({
        "success": true,
        "filename": format!("Reporte_606_{compact_period}.csv"),
        "records": expenses.len(),
        "content": content,
    }))
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
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

    #[allow(clippy::too_many_arguments)]
    fn insert_receipt(
        db: &DbState,
        id: &str,
        total: f64,
        method: &str,
        is_fiscal: bool,
        fiscal_number: Option<&str>,
        created_at: &str,
    ) {
        let subtotal = total / 1.28;
        let conn = db.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO receipts (id, customer_name, table_number, subtotal, itbis, tip, total,
                                   payment_method, is_fiscal, fiscal_number, employee_id, created_at)
             VALUES (?1, 'Ana', 1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'emp-1', ?9)",
            params![
                id,
                subtotal,
                subtotal * 0.18,
                subtotal * 0.10,
                total,
                method,
                is_fiscal as i64,
                fiscal_number,
                created_at,
            ],
        )
        .unwrap();
    }

    fn recent(days_ago: i64, hour: u32) -> String {
        let date = Utc::now() - Duration::days(days_ago);
        date.date_naive()
            .and_hms_opt(hour, 30, 0)
            .unwrap()
            .and_utc()
            .to_rfc3339()
    }

    #[test]
    fn test_sales_history_daily_summaries() {
        let db = test_db();
        insert_receipt(&db, "r1", 128.0, "cash", false, None, &recent(1, 13));
        insert_receipt(&db, "r2", 64.0, "card", false, None, &recent(1, 20));
        insert_receipt(&db, "r3", 32.0, "cash", false, None, &recent(2, 20));

        let history = sales_history(&db, Some("emp-1"), "week").unwrap();
        assert_eq!(history["total_orders"], 3);
        assert!((history["total_sales"].as_f64().unwrap() - 224.0).abs() < 1e-9);

        let daily = history["daily"].as_array().unwrap();
        assert_eq!(daily.len(), 2);
        // Oldest day first
        assert!((daily[0]["total_sales"].as_f64().unwrap() - 32.0).abs() < 1e-9);
        assert!((daily[1]["avg_order_value"].as_f64().unwrap() - 96.0).abs() < 1e-9);

        assert_eq!(history["payment_methods"]["cash"], 2);
        assert_eq!(history["payment_methods"]["card"], 1);
        assert!(!history["day_of_week"].as_array().unwrap().is_empty());
        assert!(!history["hourly"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_sales_history_window_excludes_old_receipts() {
        let db = test_db();
        insert_receipt(&db, "r1", 100.0, "cash", false, None, &recent(40, 12));
        let week = sales_history(&db, None, "week").unwrap();
        assert_eq!(week["total_orders"], 0);
        let month = sales_history(&db, None, "month").unwrap();
        assert_eq!(month["total_orders"], 0);
    }

    #[test]
    fn test_top_items_from_paid_orders() {
        let db = test_db();
        let conn = db.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO menu_items (id, name, category, price) VALUES ('beer', 'Draft Beer', 'Beer', 5.0)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO orders (id, customer_name, table_number, status, employee_id, created_at, updated_at)
             VALUES ('o1', 'Ana', 1, 'paid', 'emp-1', ?1, ?1)",
            params![Utc::now().to_rfc3339()],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO order_items (id, order_id, menu_item_id, quantity, price, created_at)
             VALUES ('i1', 'o1', 'beer', 3, 5.0, datetime('now'))",
            [],
        )
        .unwrap();
        drop(conn);

        let history = sales_history(&db, Some("emp-1"), "week").unwrap();
        let top = history["top_items"].as_array().unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0]["name"], "Draft Beer");
        assert_eq!(top[0]["qty"], 3);
    }

    #[test]
    fn test_607_report_layout() {
        let db = test_db();
        insert_receipt(
            &db,
            "r1",
            128.0,
            "cash",
            true,
            Some("B0100000123"),
            "2026-07-15T19:30:00+00:00",
        );
        insert_receipt(&db, "r2", 64.0, "card", true, None, "2026-07-20T21:00:00+00:00");

        let report = generate_report_607(&db, "2026-07").unwrap();
        assert_eq!(report["records"], 2);
        assert_eq!(report["filename"], "Reporte_607_202607.csv");

        let content = report["content"].as_str().unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "Reporte 607 generado para One Piece Bar & Tapas");
        assert_eq!(lines[1], "RNC: 132868226");
        assert_eq!(lines[2], "Período: 202607");
        assert_eq!(lines[3], "Cantidad de registros: 2");
        assert_eq!(lines[5], "");

        // Header row plus one row per receipt, 24 comma-separated columns
        let header = lines[6];
        assert_eq!(header.split(',').count(), 24);
        // Receipts load newest-first, so r2 (card) is line 7 and r1 line 8
        let cash_row = lines[8];
        assert_eq!(cash_row.split(',').count(), 24);
        let cols: Vec<&str> = cash_row.split(',').collect();
        assert_eq!(cols[0], "B0100000123");
        assert_eq!(cols[2], "B0100000123");
        assert_eq!(cols[4], "202607");
        assert_eq!(cols[5], "15");
        assert_eq!(cols[23], "01", "cash maps to forma de pago 01");

        let card_row: Vec<&str> = lines[7].split(',').collect();
        assert_eq!(card_row[0], "132868226", "missing RNC falls back to company");
        assert_eq!(card_row[2], "B0100000000", "missing NCF falls back to default");
        assert_eq!(card_row[23], "02", "card maps to forma de pago 02");
    }

    #[test]
    fn test_607_widens_to_non_fiscal_receipts() {
        let db = test_db();
        insert_receipt(&db, "r1", 50.0, "cash", false, None, "2026-07-02T12:00:00+00:00");
        let report = generate_report_607(&db, "2026-07").unwrap();
        assert_eq!(report["records"], 1);
    }

    #[test]
    fn test_607_no_sales_is_an_error() {
        let db = test_db();
        let err = generate_report_607(&db, "2026-07").unwrap_err();
        assert!(err.to_string().contains("No hay órdenes"));
    }

    #[test]
    fn test_606_report_layout() {
        let db = test_db();
        let conn = db.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO simple_receipts (id, supplier, amount, itbis, receipt_date, rnc, ncf, payment_type, created_at)
             VALUES ('e1', 'Distribuidora Norte', 236.0, 36.0, '2026-07-03', '101234567', 'B0100000055', NULL, datetime('now'))",
            [],
        )
        .unwrap();
        drop(conn);

        let report = generate_report_606(&db, "2026-07").unwrap();
        assert_eq!(report["records"], 1);
        let content = report["content"].as_str().unwrap();
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(lines[0], "Reporte 606 generado para One Piece Bar & Tapas");
        assert_eq!(lines[1], "RNC o Cédula\t132868226");
        assert_eq!(lines[2], "Período\t202607");
        assert_eq!(lines[3], "Cantidad de registros\t1");
        assert_eq!(lines[4], "Total monto facturado\t236.00");
        assert_eq!(lines[5], "");

        let header = lines[6];
        assert_eq!(header.split('\t').count(), 26);
        let row: Vec<&str> = lines[7].split('\t').collect();
        assert_eq!(row.len(), 26);
        assert_eq!(row[0], "1");
        assert_eq!(row[1], "101234567");
        assert_eq!(row[4], "B0100000055");
        assert_eq!(row[6], "202607");
        assert_eq!(row[7], "03");
        assert_eq!(row[11], "200.00", "goods = total - itbis");
        assert_eq!(row[12], "236.00");
        assert_eq!(row[13], "36.00");
        assert_eq!(row[25], "03", "missing payment type defaults to 03");
    }

    #[test]
    fn test_606_falls_back_to_legacy_expenses() {
        let db = test_db();
        let conn = db.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO expenses (id, supplier, amount, itbis, expense_date, rnc, ncf, created_at)
             VALUES ('x1', 'Proveedor Viejo', 118.0, 18.0, '2026-07-10', NULL, NULL, datetime('now'))",
            [],
        )
        .unwrap();
        drop(conn);

        let report = generate_report_606(&db, "2026-07").unwrap();
        assert_eq!(report["records"], 1);
        let content = report["content"].as_str().unwrap();
        assert!(content.contains("118.00"));
    }

    #[test]
    fn test_split_dgii_date() {
        assert_eq!(
            split_dgii_date("2026-07-03"),
            ("202607".to_string(), "03".to_string())
        );
        assert_eq!(
            split_dgii_date("2026-12-25T18:00:00+00:00"),
            ("202612".to_string(), "25".to_string())
        );
        assert_eq!(split_dgii_date("garbage"), (String::new(), String::new()));
    }
}
