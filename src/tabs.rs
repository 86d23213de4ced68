//! Open-tab (cuenta) management for the POS view.
//!
//! Tabs are session state, never persisted: a tab holds its line items
//! locally, and every item added is immediately dispatched as a persisted
//! order scoped to the item's fulfillment station. Closing a tab discards
//! the local state only; already-dispatched orders stay on their boards.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::DbState;
use crate::error::{PosError, PosResult};
use crate::menu;
use crate::orders::{self, DispatchItem};
use crate::shifts;
use crate::totals;

/// A line on an open tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabItem {
    pub item_id: String,
    pub quantity: i64,
}

/// An open customer check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tab {
    pub id: String,
    pub customer_name: String,
    pub table_number: i64,
    pub is_fiscal: bool,
    pub fiscal_number: Option<String>,
    pub employee_id: String,
    pub created_at: String,
    pub is_open: bool,
    pub items: Vec<TabItem>,
}

/// Tauri managed state holding the session's open tabs.
#[derive(Default)]
pub struct TabState {
    tabs: Mutex<Vec<Tab>>,
    active_tab_id: Mutex<Option<String>>,
}

impl TabState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a single tab.
    pub fn get(&self, tab_id: &str) -> Option<Tab> {
        self.tabs
            .lock()
            .ok()?
            .iter()
            .find(|t| t.id == tab_id)
            .cloned()
    }

    pub fn active_tab(&self) -> Option<Tab> {
        let active_id = self.active_tab_id.lock().ok()?.clone()?;
        self.get(&active_id)
    }
}

// ---------------------------------------------------------------------------
// Guards
// ---------------------------------------------------------------------------

/// Item-adding and tab-creation both require a logged-in employee with an
/// active shift.
fn require_active_shift(db: &DbState, employee_id: Option<&str>, action: &str) -> PosResult<String> {
    let employee_id = match employee_id {
        Some(id) if !id.trim().is_empty() => id.to_string(),
        _ => {
            return Err(PosError::validation(format!("Please log in to {action}")));
        }
    };
    if !shifts::shift_is_active(db, &employee_id)? {
        return Err(PosError::validation(format!(
            "Please start your shift to {action}"
        )));
    }
    Ok(employee_id)
}

// ---------------------------------------------------------------------------
// Tab lifecycle
// ---------------------------------------------------------------------------

/// Open a new empty tab and make it the active selection. All other tabs
/// lose their `is_open` highlight (cosmetic, not a lock).
pub fn create_tab(db: &DbState, state: &TabState, employee_id: Option<&str>) -> PosResult<Value> {
    let employee_id = require_active_shift(db, employee_id, "create a tab")?;

    let mut tabs = state
        .tabs
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;
    let tab_number = tabs.len() as i64 + 1;
    let tab = Tab {
        id: Uuid::new_v4().to_string(),
        customer_name: format!("Customer {tab_number}"),
        table_number: tab_number,
        is_fiscal: false,
        fiscal_number: None,
        employee_id,
        created_at: Utc::now().to_rfc3339(),
        is_open: true,
        items: Vec::new(),
    };

    for existing in tabs.iter_mut() {
        existing.is_open = false;
    }
    let tab_json = serde_json::to_value(&tab).map_err(|e| PosError::Database(e.to_string()))?;
    let tab_id = tab.id.clone();
    tabs.insert(0, tab);
    drop(tabs);

    *state
        .active_tab_id
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))? = Some(tab_id.clone());

    info!(tab_id = %tab_id, "Tab created");
    Ok(serde_json::json!({ "success": true, "tab": tab_json }))
}

/// Make a tab the active selection.
pub fn select_tab(state: &TabState, tab_id: &str) -> PosResult<Value> {
    let mut tabs = state
        .tabs
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;
    if !tabs.iter().any(|t| t.id == tab_id) {
        return Err(PosError::validation("Tab not found"));
    }
    for tab in tabs.iter_mut() {
        tab.is_open = tab.id == tab_id;
    }
    drop(tabs);
    *state
        .active_tab_id
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))? = Some(tab_id.to_string());
    Ok(serde_json::json!({ "success": true }))
}

/// Update customer name, table number, or fiscal fields.
pub fn update_tab(state: &TabState, tab_id: &str, updates: &Value) -> PosResult<Value> {
    let mut tabs = state
        .tabs
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;
    let tab = tabs
        .iter_mut()
        .find(|t| t.id == tab_id)
        .ok_or_else(|| PosError::validation("Tab not found"))?;

    let str_field = |keys: &[&str]| -> Option<String> {
        keys.iter()
            .find_map(|k| updates.get(*k).and_then(Value::as_str))
            .map(str::to_string)
    };

    if let Some(name) = str_field(&["customer_name", "customerName"]) {
        if !name.trim().is_empty() {
            tab.customer_name = name.trim().to_string();
        }
    }
    if let Some(table) = ["table_number", "tableNumber"]
        .iter()
        .find_map(|k| updates.get(*k).and_then(Value::as_i64))
    {
        if table >= 1 {
            tab.table_number = table;
        }
    }
    if let Some(fiscal) = ["is_fiscal", "isFiscal"]
        .iter()
        .find_map(|k| updates.get(*k).and_then(Value::as_bool))
    {
        tab.is_fiscal = fiscal;
    }
    if let Some(rnc) = str_field(&["fiscal_number", "fiscalNumber"]) {
        tab.fiscal_number = if rnc.trim().is_empty() {
            None
        } else {
            Some(rnc.trim().to_string())
        };
    }

    let tab_json = serde_json::to_value(&*tab).map_err(|e| PosError::Database(e.to_string()))?;
    Ok(serde_json::json!({ "success": true, "tab": tab_json }))
}

/// Discard a tab from session state. Does not cancel dispatched orders.
pub fn close_tab(state: &TabState, tab_id: &str) -> PosResult<Value> {
    let mut tabs = state
        .tabs
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;
    let before = tabs.len();
    tabs.retain(|t| t.id != tab_id);
    let removed = tabs.len() < before;
    drop(tabs);

    let mut active = state
        .active_tab_id
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;
    if active.as_deref() == Some(tab_id) {
        *active = None;
    }

    if removed {
        info!(tab_id = %tab_id, "Tab closed");
    }
    Ok(serde_json::json!({ "success": true, "removed": removed }))
}

/// All open tabs plus the active selection.
pub fn list_tabs(state: &TabState) -> PosResult<Value> {
    let tabs = state
        .tabs
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;
    let active = state
        .active_tab_id
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;
    Ok(serde_json::json!({
        "tabs": *tabs,
        "active_tab_id": *active,
    }))
}

// ---------------------------------------------------------------------------
// Line items
// ---------------------------------------------------------------------------

/// Add one unit of a menu item to the active tab.
///
/// The local line is appended/incremented before the order dispatch so the
/// UI updates immediately; a failed dispatch leaves the line in place and
/// surfaces the error as a notification.
pub fn add_item(db: &DbState, state: &TabState, employee_id: Option<&str>, item_id: &str) -> PosResult<Value> {
    let active_id = state
        .active_tab_id
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?
        .clone()
        .ok_or_else(|| PosError::validation("No active tab selected"))?;

    let employee_id = require_active_shift(db, employee_id, "add items")?;

    let menu_item =
        menu::find_menu_item(db, item_id)?.ok_or_else(|| PosError::validation("Menu item not found"))?;
    let station = menu_item.station().ok_or_else(|| {
        PosError::validation(format!(
            "No dispatchable items for category {}",
            menu_item.category
        ))
    })?;

    // Optimistic local mutation, before the order dispatch resolves.
    let (customer_name, table_number) = {
        let mut tabs = state
            .tabs
            .lock()
            .map_err(|e| PosError::Database(e.to_string()))?;
        let tab = tabs
            .iter_mut()
            .find(|t| t.id == active_id)
            .ok_or_else(|| PosError::validation("Tab not found"))?;
        match tab.items.iter_mut().find(|i| i.item_id == item_id) {
            Some(line) => line.quantity += 1,
            None => tab.items.push(TabItem {
                item_id: item_id.to_string(),
                quantity: 1,
            }),
        }
        (tab.customer_name.clone(), tab.table_number)
    };

    let dispatch = orders::create_order_with_items(
        db,
        &customer_name,
        table_number,
        &employee_id,
        &[DispatchItem {
            menu_item_id: menu_item.id.clone(),
            quantity: 1,
            price: menu_item.price,
        }],
    );

    match dispatch {
        Ok(order) => Ok(serde_json::json!({
            "success": true,
            "station": station,
            "order": order,
        })),
        Err(e) => {
            // Local state is intentionally left ahead of the store here;
            // the staff-facing notification is the only compensation.
            warn!(item_id = %item_id, error = %e, "Order dispatch failed after local add");
            Err(e)
        }
    }
}

/// Set a line's quantity; zero or below removes the line.
pub fn update_quantity(state: &TabState, tab_id: &str, item_id: &str, quantity: i64) -> PosResult<Value> {
    let mut tabs = state
        .tabs
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;
    let tab = tabs
        .iter_mut()
        .find(|t| t.id == tab_id)
        .ok_or_else(|| PosError::validation("Tab not found"))?;

    if quantity <= 0 {
        tab.items.retain(|i| i.item_id != item_id);
    } else if let Some(line) = tab.items.iter_mut().find(|i| i.item_id == item_id) {
        line.quantity = quantity;
    } else {
        return Err(PosError::validation("Item is not on this tab"));
    }
    Ok(serde_json::json!({ "success": true }))
}

/// Remove a line entirely.
pub fn remove_item(state: &TabState, tab_id: &str, item_id: &str) -> PosResult<Value> {
    let mut tabs = state
        .tabs
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;
    let tab = tabs
        .iter_mut()
        .find(|t| t.id == tab_id)
        .ok_or_else(|| PosError::validation("Tab not found"))?;
    tab.items.retain(|i| i.item_id != item_id);
    Ok(serde_json::json!({ "success": true }))
}

/// Derived totals for a tab at a given discount percentage.
pub fn tab_totals(db: &DbState, state: &TabState, tab_id: &str, discount_percent: f64) -> PosResult<Value> {
    let tab = state
        .get(tab_id)
        .ok_or_else(|| PosError::validation("Tab not found"))?;
    let catalog = menu::load_menu_items(db)?;
    let totals = totals::calculate_tab_totals(&tab.items, &catalog, discount_percent);
    serde_json::to_value(&totals).map_err(|e| PosError::Database(e.to_string()))
}

// ===========================================================================
// Tests
// ===========================================================================
