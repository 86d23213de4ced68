//! Receipt rendering: printable HTML (80 mm layout) and plain-text email
//! bodies for settled tabs.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db;
use crate::totals::round2;

/// Business identity printed on every receipt. Values come from
/// `local_settings` (category "business") with the house defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessInfo {
    pub name: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub phone: String,
    pub rnc: String,
}

impl Default for BusinessInfo {
    fn default() -> Self {
        Self {
            name: "One Piece Bar & Tapas".into(),
            address: "Roberto Pastoriza 12".into(),
            city: "Santiago de los Caballeros 51000".into(),
            country: "Dominican Republic".into(),
            phone: "(829) 947-7217".into(),
            rnc: "132868226".into(),
        }
    }
}

impl BusinessInfo {
    pub fn from_settings(conn: &Connection) -> Self {
        let defaults = Self::default();
        let read = |key: &str, fallback: String| {
            db::get_setting(conn, "business", key).unwrap_or(fallback)
        };
        Self {
            name: read("store_name", defaults.name),
            address: read("store_address", defaults.address),
            city: read("store_city", defaults.city),
            country: read("store_country", defaults.country),
            phone: read("store_phone", defaults.phone),
            rnc: read("rnc", defaults.rnc),
        }
    }
}

/// One printed line, already grouped by item name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub name: String,
    pub quantity: i64,
    pub total: f64,
}

/// Everything needed to render a settled tab.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptData {
    pub customer_name: String,
    pub table_number: i64,
    pub is_fiscal: bool,
    #[serde(default)]
    pub fiscal_number: Option<String>,
    pub lines: Vec<ReceiptLine>,
    pub subtotal: f64,
    #[serde(default)]
    pub discount_percent: f64,
    #[serde(default)]
    pub discount_amount: f64,
    pub itbis: f64,
    pub tip: f64,
    pub total: f64,
    #[serde(default)]
    pub payment_method: Option<String>,
    pub created_at: String,
}

/// Collapse raw (name, quantity, unit_price) entries into grouped lines,
/// summing quantities per item name.
pub fn group_lines(entries: &[(String, i64, f64)]) -> Vec<ReceiptLine> {
    let mut lines: Vec<ReceiptLine> = Vec::new();
    for (name, quantity, unit_price) in entries {
        match lines.iter_mut().find(|l| &l.name == name) {
            Some(line) => {
                line.quantity += quantity;
                line.total = line.quantity as f64 * unit_price;
            }
            None => lines.push(ReceiptLine {
                name: name.clone(),
                quantity: *quantity,
                total: *quantity as f64 * unit_price,
            }),
        }
    }
    lines
}

fn payment_method_label(method: Option<&str>) -> &'static str {
    match method {
        Some("cash") => "Efectivo",
        Some("card") => "Tarjeta",
        _ => "",
    }
}

/// Printable receipt, monospace 80 mm layout.
pub fn render_receipt_html(business: &BusinessInfo, receipt: &ReceiptData) -> String {
    let mut items_html = String::new();
    for line in &receipt.lines {
        items_html.push_str(&format!(
            "<div class=\"receipt-item\"><span>{} x{}</span><span>RD${:.2}</span></div>\n",
            line.name,
            line.quantity,
            round2(line.total)
        ));
    }

    // Fiscal receipts carry the RNC instead of the table line
    let id_line = match (&receipt.is_fiscal, &receipt.fiscal_number) {
        (true, Some(rnc)) => format!("<p><strong>RNC:</strong> {rnc}</p>"),
        _ => format!("<p><strong>Mesa:</strong> {}</p>", receipt.table_number),
    };

    let discount_html = if receipt.discount_percent > 0.0 {
        format!(
            "<div class=\"receipt-item text-danger\"><span>Descuento ({:.0}%):</span><span>-RD${:.2}</span></div>\n",
            receipt.discount_percent,
            round2(receipt.discount_amount)
        )
    } else {
        String::new()
    };

    let payment_html = match payment_method_label(receipt.payment_method.as_deref()) {
        "" => String::new(),
        label => format!("<p><strong>Método de Pago:</strong> {label}</p>"),
    };

    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <title>Recibo</title>
    <style>
      body {{ font-family: 'Courier New', monospace; padding: 20px; max-width: 300px; margin: 0 auto; color: #000; }}
      .receipt-item {{ display: flex; justify-content: space-between; margin: 5px 0; }}
      .divider {{ border-top: 1px dashed #000; margin: 10px 0; }}
      .total-line {{ font-weight: bold; font-size: 1.2em; margin-top: 10px; }}
      .text-danger {{ color: #dc3545; }}
      @media print {{ body {{ width: 80mm; margin: 0; padding: 10px; }} }}
    </style>
  </head>
  <body>
    <div style="text-align: center; margin-bottom: 20px;">
      <h1 style="font-size: 24px; margin-bottom: 5px;">{name}</h1>
      <p style="margin: 5px 0;">{address}</p>
      <p style="margin: 5px 0;">{city}</p>
      <p style="margin: 5px 0;">{country}</p>
      <p style="margin: 5px 0;">{phone}</p>
    </div>
    <div style="margin-bottom: 20px;">
      <p><strong>Cliente:</strong> {customer}</p>
      {id_line}
      <p><strong>Fecha:</strong> {date}</p>
      {payment_html}
    </div>
    <div class="items">
{items_html}    </div>
    <div class="divider"></div>
    <div class="receipt-item"><span>Subtotal:</span><span>RD${subtotal:.2}</span></div>
{discount_html}    <div class="receipt-item"><span>ITBIS (18%):</span><span>RD${itbis:.2}</span></div>
    <div class="receipt-item"><span>Propina (10%):</span><span>RD${tip:.2}</span></div>
    <div class="divider"></div>
    <div class="receipt-item total-line"><span>Total:</span><span>RD${total:.2}</span></div>
    <div style="text-align: center; margin-top: 20px;">
      <p>¡Gracias por su visita!</p>
    </div>
  </body>
</html>"#,
        name = business.name,
        address = business.address,
        city = business.city,
        country = business.country,
        phone = business.phone,
        customer = receipt.customer_name,
        id_line = id_line,
        date = receipt.created_at,
        payment_html = payment_html,
        items_html = items_html,
        discount_html = discount_html,
        subtotal = round2(receipt.subtotal),
        itbis = round2(receipt.itbis),
        tip = round2(receipt.tip),
        total = round2(receipt.total),
    )
}

/// Plain-text body for emailed receipts.
pub fn render_email_body(business: &BusinessInfo, receipt: &ReceiptData) -> String {
    let mut body = String::new();
    body.push_str(&format!("{}\n{}\n{}\n\n", business.name, business.address, business.phone));
    body.push_str(&format!("Cliente: {}\n", receipt.customer_name));
    match (&receipt.is_fiscal, &receipt.fiscal_number) {
        (true, Some(rnc)) => body.push_str(&format!("RNC: {rnc}\n")),
        _ => body.push_str(&format!("Mesa: {}\n", receipt.table_number)),
    }
    body.push_str(&format!("Fecha: {}\n\n", receipt.created_at));

    for line in &receipt.lines {
        body.push_str(&format!(
            "{} x{}  RD${:.2}\n",
            line.name,
            line.quantity,
            round2(line.total)
        ));
    }
    body.push('\n');
    body.push_str(&format!("Subtotal: RD${:.2}\n", round2(receipt.subtotal)));
    if receipt.discount_percent > 0.0 {
        body.push_str(&format!(
            "Descuento ({:.0}%): -RD${:.2}\n",
            receipt.discount_percent,
            round2(receipt.discount_amount)
        ));
    }
    body.push_str(&format!("ITBIS (18%): RD${:.2}\n", round2(receipt.itbis)));
    body.push_str(&format!("Propina (10%): RD${:.2}\n", round2(receipt.tip)));
    body.push_str(&format!("Total: RD${:.2}\n\n", round2(receipt.total)));
    if let Some(method) = receipt.payment_method.as_deref() {
        body.push_str(&format!(
            "Método de Pago: {}\n",
            payment_method_label(Some(method))
        ));
    }
    body.push_str("\n¡Gracias por su visita!\n");
    body
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt() -> ReceiptData {
        ReceiptData {
            customer_name: "Ana".into(),
            table_number: 4,
            is_fiscal: false,
            fiscal_number: None,
            lines: group_lines(&[
                ("Draft Beer".into(), 2, 5.0),
                ("Mojito".into(), 1, 9.0),
                ("Draft Beer".into(), 1, 5.0),
            ]),
            subtotal: 24.0,
            discount_percent: 0.0,
            discount_amount: 0.0,
            itbis: 4.32,
            tip: 2.4,
            total: 30.72,
            payment_method: Some("cash".into()),
            created_at: "2026-08-06T20:15:00Z".into(),
        }
    }

    #[test]
    fn test_group_lines_merges_by_name() {
        let r = receipt();
        assert_eq!(r.lines.len(), 2);
        let beer = r.lines.iter().find(|l| l.name == "Draft Beer").unwrap();
        assert_eq!(beer.quantity, 3);
        assert!((beer.total - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_html_contains_business_and_totals() {
        let html = render_receipt_html(&BusinessInfo::default(), &receipt());
        assert!(html.contains("One Piece Bar & Tapas"));
        assert!(html.contains("Roberto Pastoriza 12"));
        assert!(html.contains("Draft Beer x3"));
        assert!(html.contains("RD$30.72"));
        assert!(html.contains("Mesa:"));
        assert!(html.contains("Efectivo"));
        assert!(html.contains("¡Gracias por su visita!"));
        // No discount row when discount is zero
        assert!(!html.contains("Descuento"));
    }

    #[test]
    fn test_fiscal_receipt_shows_rnc_instead_of_table() {
        let mut r = receipt();
        r.is_fiscal = true;
        r.fiscal_number = Some("101-23456-7".into());
        let html = render_receipt_html(&BusinessInfo::default(), &r);
        assert!(html.contains("RNC:"));
        assert!(html.contains("101-23456-7"));
        assert!(!html.contains("Mesa:"));
    }

    #[test]
    fn test_discount_row_rendered_when_present() {
        let mut r = receipt();
        r.discount_percent = 10.0;
        r.discount_amount = 2.4;
        let html = render_receipt_html(&BusinessInfo::default(), &r);
        assert!(html.contains("Descuento (10%):"));
        assert!(html.contains("-RD$2.40"));
    }

    #[test]
    fn test_email_body_plaintext() {
        let body = render_email_body(&BusinessInfo::default(), &receipt());
        assert!(body.contains("Cliente: Ana"));
        assert!(body.contains("Mesa: 4"));
        assert!(body.contains("Total: RD$30.72"));
        assert!(body.contains("Método de Pago: Efectivo"));
        assert!(!body.contains('<'), "email body must be plain text");
    }
}
