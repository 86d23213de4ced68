//! Tab totals calculator.
//!
//! Pure arithmetic over a tab's line items and the menu catalog: subtotal,
//! percentage discount, ITBIS (18% Dominican VAT), legal tip (10%), and the
//! grand total. Internal values stay full-precision f64; rounding to two
//! decimals happens only at display/persistence time via [`round2`].

use serde::Serialize;

use crate::menu::MenuItem;
use crate::tabs::TabItem;

/// ITBIS value-added tax, flat 18%.
pub const ITBIS_RATE: f64 = 0.18;
/// Legal tip (propina), flat 10%.
pub const TIP_RATE: f64 = 0.10;

/// Breakdown of a tab's derived totals. Never stored; recomputed from the
/// current items on every call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabTotals {
    pub subtotal: f64,
    pub discount_percent: f64,
    pub discount_amount: f64,
    pub subtotal_after_discount: f64,
    pub itbis: f64,
    pub tip: f64,
    pub total: f64,
    /// Item ids that no longer resolve to a catalog entry. They contribute
    /// zero to the subtotal; callers surface them instead of failing.
    pub missing_items: Vec<String>,
}

/// Compute totals for a set of line items against the catalog.
///
/// `discount_percent` is clamped into `[0, 100]`.
pub fn calculate_tab_totals(
    items: &[TabItem],
    menu: &[MenuItem],
    discount_percent: f64,
) -> TabTotals {
    let discount_percent = discount_percent.clamp(0.0, 100.0);

    let mut subtotal = 0.0;
    let mut missing_items = Vec::new();
    for item in items {
        match menu.iter().find(|m| m.id == item.item_id) {
            Some(menu_item) => subtotal += menu_item.price * item.quantity as f64,
            None => missing_items.push(item.item_id.clone()),
        }
    }

    let discount_amount = subtotal * discount_percent / 100.0;
    let subtotal_after_discount = subtotal - discount_amount;
    let itbis = subtotal_after_discount * ITBIS_RATE;
    let tip = subtotal_after_discount * TIP_RATE;

    TabTotals {
        subtotal,
        discount_percent,
        discount_amount,
        subtotal_after_discount,
        itbis,
        tip,
        total: subtotal_after_discount + itbis + tip,
        missing_items,
    }
}

/// Round to two decimals for display and persistence.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ===========================================================================
// Tests
// ===========================================================================
