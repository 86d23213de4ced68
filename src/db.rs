//! Local SQLite database layer for OTAKU POS.
//!
//! Uses rusqlite with WAL mode. The database is the authoritative store the
//! POS, kitchen, and bar views observe: menu catalog, orders and their line
//! items, employees with shift counters, settled receipts, and the OCR
//! invoice/expense ledgers. Provides schema migrations, settings helpers,
//! and managed state for use across Tauri commands.

use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info, warn};

/// Tauri managed state holding the database connection.
pub struct DbState {
    pub conn: Mutex<Connection>,
    pub db_path: PathBuf,
}

/// Current schema version. Bump when adding new migrations.
const CURRENT_SCHEMA_VERSION: i32 = 4;

/// Initialize the database at `{app_data_dir}/pos.db`.
///
/// Creates the directory if needed, opens the connection, sets pragmas,
/// and runs any pending migrations. On corruption or open failure,
/// deletes the file and retries once.
pub fn init(app_data_dir: &Path) -> Result<DbState, String> {
    fs::create_dir_all(app_data_dir).map_err(|e| format!("Failed to create data dir: {e}"))?;

    let db_path = app_data_dir.join("pos.db");
    info!("Opening database at {}", db_path.display());

    let conn = match open_and_configure(&db_path) {
        Ok(c) => c,
        Err(first_err) => {
            warn!(
                "Database open failed ({}), deleting and retrying once",
                first_err
            );
            if db_path.exists() {
                let _ = fs::remove_file(&db_path);
                // Also remove WAL/SHM files if present
                let wal = db_path.with_extension("db-wal");
                let shm = db_path.with_extension("db-shm");
                let _ = fs::remove_file(&wal);
                let _ = fs::remove_file(&shm);
            }
            open_and_configure(&db_path)
                .map_err(|e| format!("Database open failed after retry: {e}"))?
        }
    };

    run_migrations(&conn)?;

    info!("Database initialized (schema v{CURRENT_SCHEMA_VERSION})");

    Ok(DbState {
        conn: Mutex::new(conn),
        db_path,
    })
}

/// Open the database file and apply pragmas.
fn open_and_configure(path: &Path) -> Result<Connection, String> {
    let conn = Connection::open(path).map_err(|e| format!("sqlite open: {e}"))?;

    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )
    .map_err(|e| format!("pragma setup: {e}"))?;

    Ok(conn)
}

/// Run all pending migrations up to `CURRENT_SCHEMA_VERSION`.
fn run_migrations(conn: &Connection) -> Result<(), String> {
    // Ensure schema_version table exists first
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT DEFAULT (datetime('now'))
        );",
    )
    .map_err(|e| format!("create schema_version: {e}"))?;

    let current: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current >= CURRENT_SCHEMA_VERSION {
        info!("Database schema up to date (v{current})");
        return Ok(());
    }

    info!("Migrating database from v{current} to v{CURRENT_SCHEMA_VERSION}");

    if current < 1 {
        migrate_v1(conn)?;
    }
    if current < 2 {
        migrate_v2(conn)?;
    }
    if current < 3 {
        migrate_v3(conn)?;
    }
    if current < 4 {
        migrate_v4(conn)?;
    }

    Ok(())
}

/// Migration v1: settings, menu catalog, orders, and order line items.
fn migrate_v1(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "
        -- local_settings (category/key/value store)
        CREATE TABLE IF NOT EXISTS local_settings (
            id TEXT PRIMARY KEY DEFAULT (lower(hex(randomblob(16)))),
            setting_category TEXT NOT NULL,
            setting_key TEXT NOT NULL,
            setting_value TEXT NOT NULL,
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now')),
            UNIQUE(setting_category, setting_key)
        );

        -- menu_items (sellable catalog)
        CREATE TABLE IF NOT EXISTS menu_items (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            category TEXT NOT NULL,
            price REAL NOT NULL CHECK (price >= 0),
            description TEXT,
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now'))
        );

        -- orders (one fulfillment stream per station)
        CREATE TABLE IF NOT EXISTS orders (
            id TEXT PRIMARY KEY,
            customer_name TEXT NOT NULL,
            table_number INTEGER NOT NULL DEFAULT 1,
            status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'paid')),
            employee_id TEXT,
            is_fiscal INTEGER NOT NULL DEFAULT 0,
            fiscal_number TEXT,
            payment_method TEXT,
            subtotal REAL NOT NULL DEFAULT 0,
            itbis REAL NOT NULL DEFAULT 0,
            tip REAL NOT NULL DEFAULT 0,
            total REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- order_items (line items, cascade with their order)
        CREATE TABLE IF NOT EXISTS order_items (
            id TEXT PRIMARY KEY,
            order_id TEXT NOT NULL,
            menu_item_id TEXT NOT NULL,
            quantity INTEGER NOT NULL CHECK (quantity > 0),
            price REAL NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(order_id) REFERENCES orders(id) ON DELETE CASCADE
        );

        -- Indexes
        CREATE INDEX IF NOT EXISTS idx_menu_items_category ON menu_items(category, name);
        CREATE INDEX IF NOT EXISTS idx_orders_status ON orders(status);
        CREATE INDEX IF NOT EXISTS idx_orders_employee ON orders(employee_id);
        CREATE INDEX IF NOT EXISTS idx_orders_created_at ON orders(created_at);
        CREATE INDEX IF NOT EXISTS idx_order_items_order_id ON order_items(order_id);
        CREATE INDEX IF NOT EXISTS idx_local_settings_cat_key ON local_settings(setting_category, setting_key);

        -- Record migration
        INSERT INTO schema_version (version) VALUES (1);
        ",
    )
    .map_err(|e| {
        error!("Migration v1 failed: {e}");
        format!("migration v1: {e}")
    })?;

    info!("Applied migration v1");
    Ok(())
}

/// Migration v2: employees with shift counters.
fn migrate_v2(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "
        -- employees (shift status + running drawer totals)
        CREATE TABLE IF NOT EXISTS employees (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            code_hash TEXT NOT NULL,
            shift_status TEXT NOT NULL DEFAULT 'inactive' CHECK (shift_status IN ('active', 'inactive')),
            shift_start_time TEXT,
            total_orders INTEGER NOT NULL DEFAULT 0,
            total_sales REAL NOT NULL DEFAULT 0,
            cash_in_drawer REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_employees_shift_status ON employees(shift_status);

        -- Record migration
        INSERT INTO schema_version (version) VALUES (2);
        ",
    )
    .map_err(|e| {
        error!("Migration v2 failed: {e}");
        format!("migration v2: {e}")
    })?;

    info!("Applied migration v2 (employees table)");
    Ok(())
}

/// Migration v3: settled receipts.
fn migrate_v3(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "
        -- receipts (immutable, one per settled tab)
        CREATE TABLE IF NOT EXISTS receipts (
            id TEXT PRIMARY KEY,
            customer_name TEXT NOT NULL,
            table_number INTEGER NOT NULL DEFAULT 1,
            subtotal REAL NOT NULL,
            itbis REAL NOT NULL,
            tip REAL NOT NULL,
            total REAL NOT NULL,
            payment_method TEXT NOT NULL CHECK (payment_method IN ('cash', 'card')),
            is_fiscal INTEGER NOT NULL DEFAULT 0,
            fiscal_number TEXT,
            employee_id TEXT,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_receipts_created_at ON receipts(created_at);
        CREATE INDEX IF NOT EXISTS idx_receipts_employee ON receipts(employee_id);

        -- Record migration
        INSERT INTO schema_version (version) VALUES (3);
        ",
    )
    .map_err(|e| {
        error!("Migration v3 failed: {e}");
        format!("migration v3: {e}")
    })?;

    info!("Applied migration v3 (receipts table)");
    Ok(())
}

/// Migration v4: OCR invoice ledger and expense ledgers.
fn migrate_v4(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "
        -- ocr_invoices (pending until imported into the expense ledger)
        CREATE TABLE IF NOT EXISTS ocr_invoices (
            id TEXT PRIMARY KEY,
            supplier TEXT NOT NULL,
            rcn TEXT,
            nif TEXT,
            ncf TEXT,
            date TEXT NOT NULL,
            invoice_number TEXT,
            subtotal REAL NOT NULL DEFAULT 0,
            tax REAL NOT NULL DEFAULT 0,
            total REAL NOT NULL DEFAULT 0,
            payment_type TEXT,
            receipt_image_url TEXT,
            processed INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- simple_receipts (expense ledger fed by OCR imports)
        CREATE TABLE IF NOT EXISTS simple_receipts (
            id TEXT PRIMARY KEY,
            supplier TEXT NOT NULL,
            amount REAL NOT NULL DEFAULT 0,
            itbis REAL NOT NULL DEFAULT 0,
            description TEXT,
            receipt_date TEXT NOT NULL,
            rnc TEXT,
            ncf TEXT,
            payment_type TEXT,
            file_name TEXT,
            created_at TEXT NOT NULL
        );

        -- expenses (legacy ledger, read-only fallback)
        CREATE TABLE IF NOT EXISTS expenses (
            id TEXT PRIMARY KEY,
            supplier TEXT,
            amount REAL NOT NULL DEFAULT 0,
            itbis REAL NOT NULL DEFAULT 0,
            description TEXT,
            expense_date TEXT,
            rnc TEXT,
            ncf TEXT,
            payment_type TEXT,
            created_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_ocr_invoices_processed ON ocr_invoices(processed, created_at);
        CREATE INDEX IF NOT EXISTS idx_simple_receipts_date ON simple_receipts(receipt_date);

        -- Record migration
        INSERT INTO schema_version (version) VALUES (4);
        ",
    )
    .map_err(|e| {
        error!("Migration v4 failed: {e}");
        format!("migration v4: {e}")
    })?;

    info!("Applied migration v4 (OCR and expense ledgers)");
    Ok(())
}

// ---------------------------------------------------------------------------
// Settings helpers
// ---------------------------------------------------------------------------

/// Read a setting value, or `None` when unset.
pub fn get_setting(conn: &Connection, category: &str, key: &str) -> Option<String> {
    conn.query_row(
        "SELECT setting_value FROM local_settings WHERE setting_category = ?1 AND setting_key = ?2",
        params![category, key],
        |row| row.get(0),
    )
    .ok()
}

/// Insert or update a setting.
pub fn set_setting(
    conn: &Connection,
    category: &str,
    key: &str,
    value: &str,
) -> Result<(), String> {
    conn.execute(
        "INSERT INTO local_settings (setting_category, setting_key, setting_value, updated_at)
         VALUES (?1, ?2, ?3, datetime('now'))
         ON CONFLICT(setting_category, setting_key) DO UPDATE SET
            setting_value = excluded.setting_value,
            updated_at = excluded.updated_at",
        params![category, key, value],
    )
    .map_err(|e| format!("set_setting: {e}"))?;
    Ok(())
}

/// Delete all settings in a category.
pub fn delete_all_settings(conn: &Connection, category: &str) -> Result<(), String> {
    conn.execute(
        "DELETE FROM local_settings WHERE setting_category = ?1",
        params![category],
    )
    .map_err(|e| format!("delete_all_settings: {e}"))?;
    Ok(())
}

/// Run all migrations on the given connection (test helper, not public API).
#[cfg(test)]
pub fn run_migrations_for_test(conn: &Connection) {
    run_migrations(conn).expect("run_migrations should succeed in test");
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;
             PRAGMA synchronous = NORMAL;",
        )
        .expect("pragma setup");
        conn
    }

    #[test]
    fn test_migrations_idempotent() {
        let conn = test_db();
        run_migrations(&conn).expect("first run");
        run_migrations(&conn).expect("second run");

        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_order_status_check_constraint() {
        let conn = test_db();
        run_migrations(&conn).expect("migrations");

        conn.execute(
            "INSERT INTO orders (id, customer_name, table_number, status, created_at, updated_at)
             VALUES ('ord-1', 'Customer 1', 1, 'pending', datetime('now'), datetime('now'))",
            [],
        )
        .expect("insert pending order");

        let bad = conn.execute(
            "INSERT INTO orders (id, customer_name, table_number, status, created_at, updated_at)
             VALUES ('ord-bad', 'Customer 2', 2, 'cancelled', datetime('now'), datetime('now'))",
            [],
        );
        assert!(bad.is_err(), "invalid status should be rejected");
    }

    #[test]
    fn test_order_items_cascade_delete() {
        let conn = test_db();
        run_migrations(&conn).expect("migrations");

        conn.execute(
            "INSERT INTO orders (id, customer_name, table_number, created_at, updated_at)
             VALUES ('ord-c', 'Customer 1', 3, datetime('now'), datetime('now'))",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO order_items (id, order_id, menu_item_id, quantity, price, created_at)
             VALUES ('oi-1', 'ord-c', 'mi-1', 2, 7.0, datetime('now'))",
            [],
        )
        .unwrap();

        conn.execute("DELETE FROM orders WHERE id = 'ord-c'", [])
            .unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM order_items WHERE order_id = 'ord-c'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 0, "order items should cascade-delete with order");
    }

    #[test]
    fn test_order_items_quantity_check() {
        let conn = test_db();
        run_migrations(&conn).expect("migrations");

        conn.execute(
            "INSERT INTO orders (id, customer_name, table_number, created_at, updated_at)
             VALUES ('ord-q', 'Customer 1', 1, datetime('now'), datetime('now'))",
            [],
        )
        .unwrap();
        let bad = conn.execute(
            "INSERT INTO order_items (id, order_id, menu_item_id, quantity, price, created_at)
             VALUES ('oi-bad', 'ord-q', 'mi-1', 0, 7.0, datetime('now'))",
            [],
        );
        assert!(bad.is_err(), "zero quantity should be rejected");
    }

    #[test]
    fn test_employee_shift_status_constraint() {
        let conn = test_db();
        run_migrations(&conn).expect("migrations");

        conn.execute(
            "INSERT INTO employees (id, name, code_hash, created_at, updated_at)
             VALUES ('emp-1', 'Maria', 'hash', datetime('now'), datetime('now'))",
            [],
        )
        .expect("insert employee");

        let status: String = conn
            .query_row(
                "SELECT shift_status FROM employees WHERE id = 'emp-1'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(status, "inactive");

        let bad = conn.execute(
            "INSERT INTO employees (id, name, code_hash, shift_status, created_at, updated_at)
             VALUES ('emp-bad', 'Pedro', 'hash', 'on-break', datetime('now'), datetime('now'))",
            [],
        );
        assert!(bad.is_err(), "invalid shift_status should be rejected");
    }

    #[test]
    fn test_receipt_payment_method_constraint() {
        let conn = test_db();
        run_migrations(&conn).expect("migrations");

        conn.execute(
            "INSERT INTO receipts (id, customer_name, table_number, subtotal, itbis, tip, total, payment_method, created_at)
             VALUES ('r-1', 'Customer 1', 2, 19.0, 3.42, 1.9, 24.32, 'cash', datetime('now'))",
            [],
        )
        .expect("insert cash receipt");

        let bad = conn.execute(
            "INSERT INTO receipts (id, customer_name, table_number, subtotal, itbis, tip, total, payment_method, created_at)
             VALUES ('r-bad', 'Customer 2', 2, 10.0, 1.8, 1.0, 12.8, 'crypto', datetime('now'))",
            [],
        );
        assert!(bad.is_err(), "invalid payment_method should be rejected");
    }

    #[test]
    fn test_settings_crud() {
        let conn = test_db();
        run_migrations(&conn).expect("migrations");

        // Set a value
        set_setting(&conn, "terminal", "language", "es").expect("set");
        let val = get_setting(&conn, "terminal", "language");
        assert_eq!(val, Some("es".to_string()));

        // Update
        set_setting(&conn, "terminal", "language", "en").expect("update");
        let val = get_setting(&conn, "terminal", "language");
        assert_eq!(val, Some("en".to_string()));

        // Delete category
        delete_all_settings(&conn, "terminal").expect("delete");
        let val = get_setting(&conn, "terminal", "language");
        assert!(val.is_none());
    }
}
