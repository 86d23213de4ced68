//! OCR invoice capture: field extraction and the pending-invoice ledger.
//!
//! Text recognition itself is an external black box; this module takes the
//! recognized text and extracts supplier, dates, fiscal identifiers, and
//! amounts, either with the deterministic pattern families below or by
//! delegating to the generative-text service and parsing its JSON reply
//! defensively. Extraction never blocks the review form: anything that
//! cannot be read degrades to defaults.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use chrono::{NaiveDate, Utc};
use regex::Regex;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api;
use crate::db::DbState;
use crate::error::{PosError, PosResult};
use crate::storage;
use crate::totals::round2;

/// Dominican ITBIS, assumed tax-inclusive when a receipt only shows a total.
const INCLUSIVE_TAX_RATE: f64 = 0.18;

/// Fields extracted from a receipt image's recognized text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedInvoice {
    pub supplier: String,
    /// ISO date (YYYY-MM-DD).
    pub date: String,
    pub invoice_number: String,
    pub rcn: Option<String>,
    pub nif: Option<String>,
    pub ncf: Option<String>,
    pub payment_type: Option<String>,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
}

// ---------------------------------------------------------------------------
// Deterministic extraction
// ---------------------------------------------------------------------------

fn regex(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(r) => Some(r),
        Err(e) => {
            warn!(pattern, error = %e, "invalid extraction pattern");
            None
        }
    }
}

fn first_capture(text: &str, patterns: &[&str]) -> Option<String> {
    for pattern in patterns {
        if let Some(re) = regex(pattern) {
            if let Some(caps) = re.captures(text) {
                if let Some(m) = caps.get(1) {
                    let value = m.as_str().trim();
                    if !value.is_empty() {
                        return Some(value.to_string());
                    }
                }
            }
        }
    }
    None
}

fn parse_amount(raw: &str) -> Option<f64> {
    raw.replace(',', "").trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse the date shapes receipts actually carry: ISO, US-style, and the
/// day-first forms common on Dominican invoices, with `/`, `-`, or `.`
/// separators and 2- or 4-digit years.
fn parse_flexible_date(raw: &str) -> Option<NaiveDate> {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| if c == '-' || c == '.' { '/' } else { c })
        .collect();
    // A four-digit leading component is a year; otherwise try the US shape
    // first (matching how the recognizer's upstream behaved), then day-first.
    let year_first = cleaned.split('/').next().map(|s| s.len() == 4).unwrap_or(false);
    let formats: &[&str] = if year_first {
        &["%Y/%m/%d"]
    } else {
        &["%m/%d/%Y", "%d/%m/%Y", "%d/%m/%y"]
    };
    for format in formats {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, format) {
            return Some(date);
        }
    }
    None
}

/// Fill missing amounts from the ones present.
///
/// When the total is known and exactly one of {subtotal, tax} was read,
/// derive the other by subtraction; when neither was read, assume an 18%
/// inclusive rate and back-compute both from the total.
fn reconcile_amounts(invoice: &mut ExtractedInvoice) {
    if invoice.total <= 0.0 {
        return;
    }
    if invoice.subtotal == 0.0 && invoice.tax > 0.0 {
        invoice.subtotal = invoice.total - invoice.tax;
    } else if invoice.subtotal > 0.0 && invoice.tax == 0.0 {
        invoice.tax = invoice.total - invoice.subtotal;
    } else if invoice.subtotal == 0.0 && invoice.tax == 0.0 {
        invoice.tax = round2(invoice.total * INCLUSIVE_TAX_RATE / (1.0 + INCLUSIVE_TAX_RATE));
        invoice.subtotal = invoice.total - invoice.tax;
    }
}

fn extract_invoice_fields_at(text: &str, today: NaiveDate) -> ExtractedInvoice {
    let mut invoice = ExtractedInvoice {
        date: today.to_string(),
        ..Default::default()
    };

    // Supplier: the first non-empty line is usually the company name
    if let Some(line) = text.lines().map(str::trim).find(|l| !l.is_empty()) {
        invoice.supplier = line.to_string();
    }

    // Date: labelled lines first, then bare numeric dates
    let date_patterns = [
        r"(?i)date[:\s]+(.*)",
        r"(?i)fecha[:\s]+(.*)",
        r"(\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4})",
        r"(\d{2,4}[/\-.]\d{1,2}[/\-.]\d{1,2})",
    ];
    for pattern in date_patterns {
        if let Some(raw) = first_capture(text, &[pattern]) {
            if let Some(date) = parse_flexible_date(&raw) {
                invoice.date = date.to_string();
                break;
            }
        }
    }

    // Invoice number, most specific label first
    invoice.invoice_number = first_capture(
        text,
        &[
            r"(?i)invoice\s+no[:\s]+(\S+)",
            r"(?i)factura\s+no[:\s]+(\S+)",
            r"(?i)invoice[:\s]+(\S+)",
            r"(?i)factura[:\s]+(\S+)",
            r"(?i)number[:\s]+(\d+[-\w]*)",
            r"(?i)número[:\s]+(\d+[-\w]*)",
            r"(?i)no\.?\s+(\d+[-\w]*)",
        ],
    )
    .unwrap_or_default();

    // Dominican fiscal identifiers
    invoice.rcn = first_capture(text, &[r"(?i)\b(?:rnc|rcn)[:.\s#]*([0-9][0-9-]{6,12})"]);
    invoice.nif = first_capture(text, &[r"(?i)\bnif[:.\s#]*([A-Za-z0-9-]{5,15})"]);
    invoice.ncf = first_capture(text, &[r"(?i)\bncf[:.\s#]*([A-Za-z][0-9]{8,12})"]);

    // Payment type
    invoice.payment_type = first_capture(
        text,
        &[r"(?i)\b(efectivo|cash|tarjeta|card|cr[eé]dito|transferencia|cheque)\b"],
    )
    .map(|p| p.to_lowercase());

    // Amounts. \b keeps "total" from matching inside "Subtotal"
    if let Some(raw) = first_capture(text, &[r"(?i)\btotal[:\s]+([\d,.]+)"]) {
        invoice.total = parse_amount(&raw).unwrap_or(0.0);
    }
    if let Some(raw) = first_capture(text, &[r"(?i)subtotal[:\s]+([\d,.]+)"]) {
        invoice.subtotal = parse_amount(&raw).unwrap_or(0.0);
    }
    if let Some(raw) = first_capture(
        text,
        &[
            r"(?i)\btax[:\s]+([\d,.]+)",
            r"(?i)\biva[:\s]+([\d,.]+)",
            r"(?i)\bvat[:\s]+([\d,.]+)",
            r"(?i)\bitbis[:\s]+([\d,.]+)",
        ],
    ) {
        invoice.tax = parse_amount(&raw).unwrap_or(0.0);
    }

    reconcile_amounts(&mut invoice);
    invoice
}

/// Deterministic extraction pass over recognized text.
pub fn extract_invoice_fields(text: &str) -> ExtractedInvoice {
    extract_invoice_fields_at(text, Utc::now().date_naive())
}

// ---------------------------------------------------------------------------
// AI-assisted extraction
// ---------------------------------------------------------------------------

/// Prompt asking the text service for the fixed-shape JSON object.
pub fn build_extraction_prompt(text: &str) -> String {
    format!(
        "Extract the following fields from this receipt text and reply with \
         ONLY a JSON object, no explanation: supplier (string), date \
         (YYYY-MM-DD), invoice_number (string), rcn (string or null), nif \
         (string or null), ncf (string or null), payment_type (string or \
         null), subtotal (number), tax (number), total (number). The text may \
         mix Spanish and English.\n\nReceipt text:\n{text}"
    )
}

/// Drop surrounding Markdown code fences from a model reply.
fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let without_open = match trimmed.find('\n') {
        Some(idx) => &trimmed[idx + 1..],
        None => return trimmed.to_string(),
    };
    let without_close = without_open
        .trim_end()
        .strip_suffix("```")
        .unwrap_or(without_open);
    without_close.trim().to_string()
}

fn json_str(value: &Value, key: &str, alt: &str) -> Option<String> {
    value
        .get(key)
        .or_else(|| value.get(alt))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn json_num(value: &Value, key: &str) -> f64 {
    match value.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => parse_amount(s).unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Parse the model's reply into an invoice. Any shape problem is an
/// extraction error so the caller can fall back to the deterministic pass.
pub fn parse_ai_invoice(raw: &str) -> PosResult<ExtractedInvoice> {
    let cleaned = strip_code_fences(raw);
    let json: Value = serde_json::from_str(&cleaned)
        .map_err(|e| PosError::Extraction(format!("reply is not JSON: {e}")))?;
    if !json.is_object() {
        return Err(PosError::Extraction("reply is not a JSON object".into()));
    }

    let mut invoice = ExtractedInvoice {
        supplier: json_str(&json, "supplier", "proveedor").unwrap_or_default(),
        date: json_str(&json, "date", "fecha")
            .and_then(|d| parse_flexible_date(&d))
            .map(|d| d.to_string())
            .unwrap_or_else(|| Utc::now().date_naive().to_string()),
        invoice_number: json_str(&json, "invoice_number", "invoiceNumber").unwrap_or_default(),
        rcn: json_str(&json, "rcn", "rnc"),
        nif: json_str(&json, "nif", "nif"),
        ncf: json_str(&json, "ncf", "ncf"),
        payment_type: json_str(&json, "payment_type", "paymentType").map(|p| p.to_lowercase()),
        subtotal: json_num(&json, "subtotal"),
        tax: json_num(&json, "tax"),
        total: json_num(&json, "total"),
    };
    reconcile_amounts(&mut invoice);
    Ok(invoice)
}

/// AI-assisted extraction with silent fallback to the deterministic pass.
/// Returns the invoice plus which path produced it.
pub async fn extract_invoice_fields_ai(text: &str) -> (ExtractedInvoice, &'static str) {
    let endpoint = storage::get_credential(storage::KEY_EXTRACTION_ENDPOINT).unwrap_or_default();
    let api_key = storage::get_credential(storage::KEY_EXTRACTION_API_KEY).unwrap_or_default();

    if !endpoint.is_empty() && !api_key.is_empty() {
        let prompt = build_extraction_prompt(text);
        match api::request_extraction(&endpoint, &api_key, &prompt).await {
            Ok(reply) => match parse_ai_invoice(&reply) {
                Ok(invoice) => return (invoice, "ai"),
                Err(e) => {
                    warn!(error = %e, "AI extraction reply unusable, falling back to heuristics");
                }
            },
            Err(e) => {
                let err = PosError::External(e);
                warn!(error = %err, "AI extraction request failed, falling back to heuristics");
            }
        }
    }

    (extract_invoice_fields(text), "heuristic")
}

// ---------------------------------------------------------------------------
// Pending-invoice ledger
// ---------------------------------------------------------------------------

/// Normalize a user-entered date to ISO, keeping the raw value when it
/// cannot be parsed.
fn normalize_iso_date(raw: &str) -> String {
    parse_flexible_date(raw)
        .map(|d| d.to_string())
        .unwrap_or_else(|| raw.trim().to_string())
}

/// Reject data-URL images whose base64 payload does not decode.
fn validate_receipt_image(url: &str) -> PosResult<()> {
    if let Some(encoded) = url.strip_prefix("data:").and_then(|rest| rest.split_once(";base64,")) {
        BASE64_STANDARD
            .decode(encoded.1.trim())
            .map_err(|_| PosError::validation("Receipt image data is corrupt"))?;
    }
    Ok(())
}

/// Save an extracted invoice for staff review (`processed = false`).
pub fn save_ocr_invoice(db: &DbState, payload: &Value) -> PosResult<Value> {
    let supplier = payload
        .get("supplier")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    let date = payload
        .get("date")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    let total = payload.get("total").and_then(Value::as_f64).unwrap_or(0.0);
    if supplier.is_empty() || date.is_empty() || total <= 0.0 {
        return Err(PosError::validation(
            "Por favor, complete todos los campos requeridos.",
        ));
    }

    let receipt_image_url = payload
        .get("receipt_image_url")
        .and_then(Value::as_str)
        .map(str::to_string);
    if let Some(ref url) = receipt_image_url {
        validate_receipt_image(url)?;
    }

    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();
    let conn = db
        .conn
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;
    conn.execute(
        "INSERT INTO ocr_invoices (
            id, supplier, rcn, nif, ncf, date, invoice_number,
            subtotal, tax, total, payment_type, receipt_image_url,
            processed, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 0, ?13, ?13)",
        params![
            id,
            supplier,
            payload.get("rcn").and_then(Value::as_str),
            payload.get("nif").and_then(Value::as_str),
            payload.get("ncf").and_then(Value::as_str),
            normalize_iso_date(date),
            payload.get("invoice_number").and_then(Value::as_str),
            payload.get("subtotal").and_then(Value::as_f64).unwrap_or(0.0),
            payload.get("tax").and_then(Value::as_f64).unwrap_or(0.0),
            total,
            payload.get("payment_type").and_then(Value::as_str),
            receipt_image_url,
            now,
        ],
    )?;

    info!(invoice_id = %id, supplier = %supplier, "OCR invoice saved for review");
    Ok(serde_json::json!({ "success": true, "id": id }))
}

fn invoice_row_json(row: &rusqlite::Row<'_>) -> rusqlite::Result<Value> {
    Ok(serde_json::json!({
        "id": row.get::<_, String>(0)?,
        "supplier": row.get::<_, String>(1)?,
        "rcn": row.get::<_, Option<String>>(2)?,
        "nif": row.get::<_, Option<String>>(3)?,
        "ncf": row.get::<_, Option<String>>(4)?,
        "date": row.get::<_, String>(5)?,
        "invoice_number": row.get::<_, Option<String>>(6)?,
        "subtotal": row.get::<_, f64>(7)?,
        "tax": row.get::<_, f64>(8)?,
        "total": row.get::<_, f64>(9)?,
        "payment_type": row.get::<_, Option<String>>(10)?,
        "receipt_image_url": row.get::<_, Option<String>>(11)?,
        "processed": row.get::<_, i64>(12)? != 0,
        "created_at": row.get::<_, String>(13)?,
    }))
}

/// Pending (not yet imported) invoices, newest first.
pub fn list_pending_ocr_invoices(db: &DbState) -> PosResult<Value> {
    let conn = db
        .conn
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;
    let mut stmt = conn.prepare(
        "SELECT id, supplier, rcn, nif, ncf, date, invoice_number,
                subtotal, tax, total, payment_type, receipt_image_url,
                processed, created_at
         FROM ocr_invoices
         WHERE processed = 0
         ORDER BY created_at DESC",
    )?;
    let rows = stmt.query_map([], |row| invoice_row_json(row))?;
    let invoices: Vec<Value> = rows.filter_map(|r| r.ok()).collect();
    Ok(Value::Array(invoices))
}

/// Staff edits from the review form.
pub fn update_ocr_invoice(db: &DbState, invoice_id: &str, payload: &Value) -> PosResult<Value> {
    let conn = db
        .conn
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;

    let processed: i64 = conn
        .query_row(
            "SELECT processed FROM ocr_invoices WHERE id = ?1",
            params![invoice_id],
            |row| row.get(0),
        )
        .map_err(|_| PosError::validation("OCR invoice not found"))?;
    if processed != 0 {
        return Err(PosError::validation("Invoice was already imported"));
    }

    let now = Utc::now().to_rfc3339();
    let date = payload
        .get("date")
        .and_then(Value::as_str)
        .map(normalize_iso_date);
    conn.execute(
        "UPDATE ocr_invoices SET
            supplier = COALESCE(?1, supplier),
            rcn = COALESCE(?2, rcn),
            nif = COALESCE(?3, nif),
            ncf = COALESCE(?4, ncf),
            date = COALESCE(?5, date),
            invoice_number = COALESCE(?6, invoice_number),
            subtotal = COALESCE(?7, subtotal),
            tax = COALESCE(?8, tax),
            total = COALESCE(?9, total),
            payment_type = COALESCE(?10, payment_type),
            updated_at = ?11
         WHERE id = ?12",
        params![
            payload.get("supplier").and_then(Value::as_str),
            payload.get("rcn").and_then(Value::as_str),
            payload.get("nif").and_then(Value::as_str),
            payload.get("ncf").and_then(Value::as_str),
            date,
            payload.get("invoice_number").and_then(Value::as_str),
            payload.get("subtotal").and_then(Value::as_f64),
            payload.get("tax").and_then(Value::as_f64),
            payload.get("total").and_then(Value::as_f64),
            payload.get("payment_type").and_then(Value::as_str),
            now,
            invoice_id,
        ],
    )?;

    Ok(serde_json::json!({ "success": true }))
}

/// Import a reviewed invoice into the expense ledger and flag it processed,
/// in one transaction.
pub fn import_ocr_invoice(db: &DbState, invoice_id: &str) -> PosResult<Value> {
    let conn = db
        .conn
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;

    type InvoiceRow = (String, Option<String>, Option<String>, String, Option<String>, f64, f64, Option<String>, Option<String>, i64);
    let (supplier, rcn, ncf, date, invoice_number, tax, total, payment_type, image_url, processed): InvoiceRow =
        conn.query_row(
            "SELECT supplier, rcn, ncf, date, invoice_number, tax, total,
                    payment_type, receipt_image_url, processed
             FROM ocr_invoices WHERE id = ?1",
            params![invoice_id],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                    row.get(8)?,
                    row.get(9)?,
                ))
            },
        )
        .map_err(|_| PosError::validation("OCR invoice not found"))?;

    if processed != 0 {
        return Err(PosError::validation("Invoice was already imported"));
    }

    let now = Utc::now().to_rfc3339();
    let receipt_id = Uuid::new_v4().to_string();
    let description = format!(
        "Importada desde OCR: Factura {}",
        invoice_number.as_deref().filter(|s| !s.is_empty()).unwrap_or("N/A")
    );

    conn.execute_batch("BEGIN IMMEDIATE")
        .map_err(|e| PosError::Database(format!("begin transaction: {e}")))?;

    let result = (|| -> PosResult<()> {
        conn.execute(
            "INSERT INTO simple_receipts (
                id, supplier, amount, itbis, description, receipt_date,
                rnc, ncf, payment_type, file_name, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                receipt_id,
                supplier,
                total,
                tax,
                description,
                date,
                rcn,
                ncf,
                payment_type,
                image_url.unwrap_or_default(),
                now,
            ],
        )?;
        conn.execute(
            "UPDATE ocr_invoices SET processed = 1, updated_at = ?1 WHERE id = ?2",
            params![now, invoice_id],
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

    info!(invoice_id = %invoice_id, receipt_id = %receipt_id, "OCR invoice imported into expense ledger");
    Ok(serde_json::json!({ "success": true, "receipt_id": receipt_id }))
}

/// Delete a pending invoice. Imported ones are part of the ledger history
/// and stay.
pub fn delete_ocr_invoice(db: &DbState, invoice_id: &str) -> PosResult<Value> {
    let conn = db
        .conn
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;
    let deleted = conn.execute(
        "DELETE FROM ocr_invoices WHERE id = ?1 AND processed = 0",
        params![invoice_id],
    )?;
    if deleted == 0 {
        return Err(PosError::validation(
            "OCR invoice not found or already imported",
        ));
    }
    Ok(serde_json::json!({ "success": true }))
}

/// Expense ledger rows for the operations view: `simple_receipts` first,
/// the legacy `expenses` table when the new ledger is empty.
pub fn list_expenses(db: &DbState) -> PosResult<Value> {
    let conn = db
        .conn
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;

    let mut stmt = conn.prepare(
        "SELECT id, supplier, amount, itbis, description, receipt_date, rnc, ncf, payment_type
         FROM simple_receipts
         ORDER BY receipt_date DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(serde_json::json!({
            "id": row.get::<_, String>(0)?,
            "supplier": row.get::<_, String>(1)?,
            "amount": row.get::<_, f64>(2)?,
            "itbis": row.get::<_, f64>(3)?,
            "description": row.get::<_, Option<String>>(4)?,
            "receipt_date": row.get::<_, String>(5)?,
            "rnc": row.get::<_, Option<String>>(6)?,
            "ncf": row.get::<_, Option<String>>(7)?,
            "payment_type": row.get::<_, Option<String>>(8)?,
            "source": "simple_receipts",
        }))
    })?;
    let receipts: Vec<Value> = rows.filter_map(|r| r.ok()).collect();
    if !receipts.is_empty() {
        return Ok(Value::Array(receipts));
    }

    let mut stmt = conn.prepare(
        "SELECT id, supplier, amount, itbis, description, expense_date, rnc, ncf, payment_type
         FROM expenses
         ORDER BY expense_date DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(serde_json::json!({
            "id": row.get::<_, String>(0)?,
            "supplier": row.get::<_, Option<String>>(1)?,
            "amount": row.get::<_, f64>(2)?,
            "itbis": row.get::<_, f64>(3)?,
            "description": row.get::<_, Option<String>>(4)?,
            "receipt_date": row.get::<_, Option<String>>(5)?,
            "rnc": row.get::<_, Option<String>>(6)?,
            "ncf": row.get::<_, Option<String>>(7)?,
            "payment_type": row.get::<_, Option<String>>(8)?,
            "source": "expenses",
        }))
    })?;
    Ok(Value::Array(rows.filter_map(|r| r.ok()).collect()))
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

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 6).unwrap()
    }

    #[test]
    fn test_total_only_back_computes_inclusive_tax() {
        let text = "Colmado La Esquina\nGracias por su compra\nTotal: 236.00\n";
        let invoice = extract_invoice_fields_at(text, today());
        assert_eq!(invoice.supplier, "Colmado La Esquina");
        assert_eq!(invoice.total, 236.00);
        assert_eq!(invoice.tax, 36.00);
        assert_eq!(invoice.subtotal, 200.00);
    }

    #[test]
    fn test_subtotal_and_total_derive_tax() {
        let text = "Ferretería El Martillo\nSubtotal: 100.00\nTotal: 118.00\n";
        let invoice = extract_invoice_fields_at(text, today());
        assert_eq!(invoice.subtotal, 100.00);
        assert_eq!(invoice.total, 118.00);
        assert!((invoice.tax - 18.00).abs() < 1e-9);
    }

    #[test]
    fn test_tax_and_total_derive_subtotal() {
        let text = "Proveedor X\nITBIS: 36.00\nTotal: 236.00\n";
        let invoice = extract_invoice_fields_at(text, today());
        assert!((invoice.subtotal - 200.00).abs() < 1e-9);
    }

    #[test]
    fn test_total_pattern_does_not_match_subtotal_line() {
        let text = "Proveedor X\nSubtotal: 200.00\n";
        let invoice = extract_invoice_fields_at(text, today());
        assert_eq!(invoice.subtotal, 200.00);
        assert_eq!(invoice.total, 0.0, "no Total line means no total");
    }

    #[test]
    fn test_spanish_labels_and_identifiers() {
        let text = "Distribuidora Norte SRL\nRNC: 101-23456-7\nNCF: B0100000055\n\
                    Factura No: F-2026-0042\nFecha: 15/07/2026\nEfectivo\n\
                    Subtotal: 1,500.00\nITBIS: 270.00\nTotal: 1,770.00\n";
        let invoice = extract_invoice_fields_at(text, today());
        assert_eq!(invoice.supplier, "Distribuidora Norte SRL");
        assert_eq!(invoice.rcn.as_deref(), Some("101-23456-7"));
        assert_eq!(invoice.ncf.as_deref(), Some("B0100000055"));
        assert_eq!(invoice.invoice_number, "F-2026-0042");
        assert_eq!(invoice.date, "2026-07-15");
        assert_eq!(invoice.payment_type.as_deref(), Some("efectivo"));
        assert_eq!(invoice.subtotal, 1500.00);
        assert_eq!(invoice.tax, 270.00);
        assert_eq!(invoice.total, 1770.00);
    }

    #[test]
    fn test_unparseable_text_degrades_to_defaults() {
        let invoice = extract_invoice_fields_at("", today());
        assert_eq!(invoice.supplier, "");
        assert_eq!(invoice.date, "2026-08-06", "date defaults to today");
        assert_eq!(invoice.total, 0.0);
    }

    #[test]
    fn test_parse_flexible_date_formats() {
        assert_eq!(
            parse_flexible_date("2026-07-15"),
            NaiveDate::from_ymd_opt(2026, 7, 15)
        );
        assert_eq!(
            parse_flexible_date("15/07/2026"),
            NaiveDate::from_ymd_opt(2026, 7, 15)
        );
        assert_eq!(
            parse_flexible_date("07/15/2026"),
            NaiveDate::from_ymd_opt(2026, 7, 15)
        );
        assert_eq!(
            parse_flexible_date("15.07.26"),
            NaiveDate::from_ymd_opt(2026, 7, 15)
        );
        assert_eq!(parse_flexible_date("not a date"), None);
    }

    #[test]
    fn test_parse_ai_invoice_with_code_fences() {
        let reply = "```json\n{\"supplier\":\"Distribuidora Norte\",\"date\":\"2026-07-15\",\
                     \"invoice_number\":\"F-42\",\"rcn\":\"101234567\",\"nif\":null,\
                     \"ncf\":\"B0100000055\",\"payment_type\":\"Efectivo\",\
                     \"subtotal\":200,\"tax\":0,\"total\":236}\n```";
        let invoice = parse_ai_invoice(reply).expect("parse");
        assert_eq!(invoice.supplier, "Distribuidora Norte");
        assert_eq!(invoice.date, "2026-07-15");
        assert_eq!(invoice.payment_type.as_deref(), Some("efectivo"));
        // Reconciliation fills the missing tax
        assert!((invoice.tax - 36.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_ai_invoice_numbers_as_strings() {
        let reply = r#"{"supplier":"X","date":"2026-01-02","total":"1,180.00","subtotal":"1,000.00","tax":"180.00"}"#;
        let invoice = parse_ai_invoice(reply).expect("parse");
        assert_eq!(invoice.total, 1180.0);
        assert_eq!(invoice.subtotal, 1000.0);
    }

    #[test]
    fn test_parse_ai_invoice_rejects_garbage() {
        assert!(parse_ai_invoice("I could not read the receipt, sorry!").is_err());
        assert!(parse_ai_invoice("```json\nnot json\n```").is_err());
        assert!(parse_ai_invoice("[1,2,3]").is_err());
    }

    #[test]
    fn test_ledger_lifecycle() {
        let db = test_db();

        let saved = save_ocr_invoice(
            &db,
            &serde_json::json!({
                "supplier": "Distribuidora Norte",
                "date": "15/07/2026",
                "invoice_number": "F-42",
                "subtotal": 200.0,
                "tax": 36.0,
                "total": 236.0,
                "rcn": "101234567",
                "ncf": "B0100000055",
            }),
        )
        .expect("save");
        let id = saved["id"].as_str().unwrap().to_string();

        // Date normalized to ISO on save
        let pending = list_pending_ocr_invoices(&db).unwrap();
        assert_eq!(pending.as_array().unwrap().len(), 1);
        assert_eq!(pending[0]["date"], "2026-07-15");
        assert_eq!(pending[0]["processed"], false);

        // Staff edits survive
        update_ocr_invoice(&db, &id, &serde_json::json!({ "supplier": "Dist. Norte SRL" }))
            .expect("update");
        let pending = list_pending_ocr_invoices(&db).unwrap();
        assert_eq!(pending[0]["supplier"], "Dist. Norte SRL");

        // Import copies into the ledger and flags processed
        import_ocr_invoice(&db, &id).expect("import");
        let pending = list_pending_ocr_invoices(&db).unwrap();
        assert!(pending.as_array().unwrap().is_empty());

        let expenses = list_expenses(&db).unwrap();
        assert_eq!(expenses.as_array().unwrap().len(), 1);
        assert_eq!(expenses[0]["supplier"], "Dist. Norte SRL");
        assert_eq!(expenses[0]["amount"], 236.0);
        assert_eq!(expenses[0]["itbis"], 36.0);
        assert!(expenses[0]["description"]
            .as_str()
            .unwrap()
            .contains("Factura F-42"));

        // Imported invoices cannot be imported again, edited, or deleted
        assert!(import_ocr_invoice(&db, &id).is_err());
        assert!(update_ocr_invoice(&db, &id, &serde_json::json!({})).is_err());
        assert!(delete_ocr_invoice(&db, &id).is_err());
    }

    #[test]
    fn test_save_requires_supplier_date_total() {
        let db = test_db();
        let err = save_ocr_invoice(
            &db,
            &serde_json::json!({ "supplier": "", "date": "2026-07-15", "total": 100.0 }),
        )
        .unwrap_err();
        assert!(err.to_string().contains("complete todos los campos"));

        let err = save_ocr_invoice(
            &db,
            &serde_json::json!({ "supplier": "X", "date": "2026-07-15", "total": 0.0 }),
        )
        .unwrap_err();
        assert!(err.to_string().contains("complete todos los campos"));
    }

    #[test]
    fn test_delete_pending_invoice() {
        let db = test_db();
        let saved = save_ocr_invoice(
            &db,
            &serde_json::json!({ "supplier": "X", "date": "2026-07-15", "total": 10.0 }),
        )
        .unwrap();
        let id = saved["id"].as_str().unwrap();

        delete_ocr_invoice(&db, id).expect("delete");
        assert!(list_pending_ocr_invoices(&db)
            .unwrap()
            .as_array()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_corrupt_data_url_rejected() {
        let db = test_db();
        let err = save_ocr_invoice(
            &db,
            &serde_json::json!({
                "supplier": "X",
                "date": "2026-07-15",
                "total": 10.0,
                "receipt_image_url": "data:image/png;base64,!!!not-base64!!!",
            }),
        )
        .unwrap_err();
        assert!(err.to_string().contains("corrupt"));
    }

    #[test]
    fn test_list_expenses_falls_back_to_legacy_table() {
        let db = test_db();
        let conn = db.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO expenses (id, supplier, amount, itbis, expense_date, created_at)
             VALUES ('x1', 'Proveedor Viejo', 118.0, 18.0, '2026-06-01', datetime('now'))",
            [],
        )
        .unwrap();
        drop(conn);

        let expenses = list_expenses(&db).unwrap();
        assert_eq!(expenses.as_array().unwrap().len(), 1);
        assert_eq!(expenses[0]["source"], "expenses");
    }
}
