//! Menu catalog for OTAKU POS.
//!
//! The catalog drives both ordering views and fulfillment routing: every
//! category resolves to a station (kitchen or bar) exactly once, at load
//! time, and the resolved tag is what the rest of the system consumes.

use chrono::Utc;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::db::DbState;
use crate::error::{PosError, PosResult};

/// Categories routed to the bar board. Everything in `Food` goes to the
/// kitchen; categories outside both lists are not orderable.
const BAR_CATEGORIES: &[&str] = &["Beer", "Wine", "Cocktails", "Spirits", "Soft Drinks"];

/// Fulfillment station a menu category routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Station {
    Kitchen,
    Bar,
}

impl Station {
    /// Resolve a category name to its station. `None` means the category is
    /// unknown and items in it cannot be dispatched.
    pub fn for_category(category: &str) -> Option<Station> {
        if category == "Food" {
            Some(Station::Kitchen)
        } else if BAR_CATEGORIES.contains(&category) {
            Some(Station::Bar)
        } else {
            None
        }
    }

    /// Categories belonging to this station.
    pub fn categories(&self) -> &'static [&'static str] {
        match self {
            Station::Kitchen => &["Food"],
            Station::Bar => BAR_CATEGORIES,
        }
    }

    pub fn parse(value: &str) -> PosResult<Station> {
        match value.trim().to_ascii_lowercase().as_str() {
            "kitchen" => Ok(Station::Kitchen),
            "bar" => Ok(Station::Bar),
            other => Err(PosError::validation(format!("Unknown station: {other}"))),
        }
    }
}

/// A sellable catalog item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: f64,
    #[serde(default)]
    pub description: Option<String>,
}

impl MenuItem {
    pub fn station(&self) -> Option<Station> {
        Station::for_category(&self.category)
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Load the full catalog ordered by category then name, as typed rows.
pub fn load_menu_items(db: &DbState) -> PosResult<Vec<MenuItem>> {
    let conn = db
        .conn
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;
    let mut stmt = conn.prepare(
        "SELECT id, name, category, price, description
         FROM menu_items
         ORDER BY category ASC, name ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(MenuItem {
            id: row.get(0)?,
            name: row.get(1)?,
            category: row.get(2)?,
            price: row.get(3)?,
            description: row.get(4)?,
        })
    })?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

/// Catalog as JSON for the ordering views, each row carrying its resolved
/// station tag.
pub fn list_menu_items(db: &DbState) -> PosResult<Value> {
    let items = load_menu_items(db)?;
    let rows: Vec<Value> = items
        .iter()
        .map(|item| {
            serde_json::json!({
                "id": item.id,
                "name": item.name,
                "category": item.category,
                "price": item.price,
                "description": item.description,
                "station": item.station(),
            })
        })
        .collect();
    Ok(Value::Array(rows))
}

/// Look up a single item by id.
pub fn find_menu_item(db: &DbState, item_id: &str) -> PosResult<Option<MenuItem>> {
    let conn = db
        .conn
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;
    let item = conn
        .query_row(
            "SELECT id, name, category, price, description FROM menu_items WHERE id = ?1",
            params![item_id],
            |row| {
                Ok(MenuItem {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    category: row.get(2)?,
                    price: row.get(3)?,
                    description: row.get(4)?,
                })
            },
        )
        .ok();
    Ok(item)
}

// ---------------------------------------------------------------------------
// Admin mutations
// ---------------------------------------------------------------------------

fn validate_item_fields(name: &str, category: &str, price: f64) -> PosResult<()> {
    if name.trim().is_empty() {
        return Err(PosError::validation("Item name is required"));
    }
    if Station::for_category(category).is_none() {
        return Err(PosError::validation(format!(
            "Unknown menu category: {category}"
        )));
    }
    if !price.is_finite() || price < 0.0 {
        return Err(PosError::validation("Price must be a non-negative number"));
    }
    Ok(())
}

/// Create a catalog item (operations/admin view only).
pub fn create_menu_item(db: &DbState, payload: &Value) -> PosResult<Value> {
    let name = payload
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();
    let category = payload
        .get("category")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();
    let price = payload.get("price").and_then(Value::as_f64).unwrap_or(-1.0);
    let description = payload
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);

    validate_item_fields(&name, &category, price)?;

    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    let conn = db
        .conn
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;
    conn.execute(
        "INSERT INTO menu_items (id, name, category, price, description, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![id, name, category, price, description, now],
    )?;

    info!(item_id = %id, name = %name, category = %category, "Menu item created");
    Ok(serde_json::json!({ "success": true, "id": id }))
}

/// Update name/category/price/description of an existing item.
pub fn update_menu_item(db: &DbState, item_id: &str, payload: &Value) -> PosResult<Value> {
    let existing =
        find_menu_item(db, item_id)?.ok_or_else(|| PosError::validation("Menu item not found"))?;

    let name = payload
        .get("name")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or(existing.name);
    let category = payload
        .get("category")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or(existing.category);
    let price = payload
        .get("price")
        .and_then(Value::as_f64)
        .unwrap_or(existing.price);
    let description = payload
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or(existing.description);

    validate_item_fields(&name, &category, price)?;

    let now = Utc::now().to_rfc3339();
    let conn = db
        .conn
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;
    conn.execute(
        "UPDATE menu_items
         SET name = ?1, category = ?2, price = ?3, description = ?4, updated_at = ?5
         WHERE id = ?6",
        params![name, category, price, description, now, item_id],
    )?;

    Ok(serde_json::json!({ "success": true, "id": item_id }))
}

/// Remove an item from the catalog. Past order lines keep their snapshot
/// price; the totals calculator reports the dangling reference instead.
pub fn delete_menu_item(db: &DbState, item_id: &str) -> PosResult<Value> {
    let conn = db
        .conn
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;
    let deleted = conn.execute("DELETE FROM menu_items WHERE id = ?1", params![item_id])?;
    if deleted == 0 {
        return Err(PosError::validation("Menu item not found"));
    }
    info!(item_id = %item_id, "Menu item deleted");
    Ok(serde_json::json!({ "success": true }))
}

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

/// House menu seeded on first run. Anime-themed cocktails plus the standing
/// bar and kitchen staples.
const DEFAULT_MENU: &[(&str, &str, f64, &str)] = &[
    (
        "Luffy",
        "Cocktails",
        12.00,
        "A powerful blend worthy of the future Pirate King",
    ),
    (
        "Shanks",
        "Cocktails",
        14.00,
        "A legendary mix that commands respect",
    ),
    ("Mojito", "Cocktails", 9.00, "Rum, mint, lime, soda"),
    (
        "Gin & Tonic",
        "Cocktails",
        8.00,
        "Premium gin with tonic water",
    ),
    ("Modelo Rubia", "Beer", 7.00, "Classic golden lager"),
    ("Modelo Negra", "Beer", 7.00, "Rich dark lager"),
    ("Draft Beer", "Beer", 5.00, "House draft beer"),
    ("House Red Wine", "Wine", 7.00, "Glass of house red wine"),
    ("Vodka", "Spirits", 6.00, "Premium vodka shot"),
    ("Coca Cola", "Soft Drinks", 3.00, "Classic cola refreshment"),
    ("Lelouch Fries", "Food", 8.00, "Strategic blend of seasonings"),
    (
        "Tapas Mixtas",
        "Food",
        11.00,
        "Rotating selection of house tapas",
    ),
];

/// Seed the default menu when the catalog is empty. Idempotent.
pub fn seed_default_menu(db: &DbState) -> PosResult<usize> {
    let conn = db
        .conn
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM menu_items", [], |row| row.get(0))?;
    if count > 0 {
        return Ok(0);
    }

    let now = Utc::now().to_rfc3339();
    let mut inserted = 0usize;
    for (name, category, price, description) in DEFAULT_MENU {
        conn.execute(
            "INSERT INTO menu_items (id, name, category, price, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![Uuid::new_v4().to_string(), name, category, price, description, now],
        )?;
        inserted += 1;
    }

    info!(count = inserted, "Seeded default menu");
    Ok(inserted)
}

// ===========================================================================
// Tests
// ===========================================================================
