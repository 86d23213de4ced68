//! Diagnostics for OTAKU POS.
//!
//! Provides:
//! - **About info**: version, build timestamp, git SHA, platform
//! - **Database health**: schema version, row counts, file size
//! - **Log rotation helpers**: used by `lib.rs` to configure rolling log files.

use rusqlite::Connection;
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use tracing::warn;

use crate::db::DbState;
use crate::error::{PosError, PosResult};

/// Maximum number of log files to retain.
pub const MAX_LOG_FILES: usize = 10;

// ---------------------------------------------------------------------------
// About info
// ---------------------------------------------------------------------------

/// Returns version, build timestamp, git SHA, and platform info.
pub fn get_about_info() -> Value {
    json!({
        "version": env!("CARGO_PKG_VERSION"),
        "buildTimestamp": env!("BUILD_TIMESTAMP"),
        "gitSha": env!("BUILD_GIT_SHA"),
        "platform": std::env::consts::OS,
        "arch": std::env::consts::ARCH,
    })
}

// ---------------------------------------------------------------------------
// Database health
// ---------------------------------------------------------------------------

fn table_count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })
    .unwrap_or(0)
}

/// Row counts and file size for the health screen.
pub fn get_database_stats(db: &DbState) -> PosResult<Value> {
    let conn = db
        .conn
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;

    let schema_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    let db_size = fs::metadata(&db.db_path).map(|m| m.len()).unwrap_or(0);

    Ok(json!({
        "schema_version": schema_version,
        "db_size_bytes": db_size,
        "tables": {
            "menu_items": table_count(&conn, "menu_items"),
            "orders": table_count(&conn, "orders"),
            "order_items": table_count(&conn, "order_items"),
            "employees": table_count(&conn, "employees"),
            "receipts": table_count(&conn, "receipts"),
            "ocr_invoices": table_count(&conn, "ocr_invoices"),
            "simple_receipts": table_count(&conn, "simple_receipts"),
        },
    }))
}

/// Lightweight health check: the connection answers a trivial query.
pub fn database_health_check(db: &DbState) -> PosResult<Value> {
    let conn = db
        .conn
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;
    let ok: i64 = conn.query_row("SELECT 1", [], |row| row.get(0))?;
    Ok(json!({ "healthy": ok == 1 }))
}

// ---------------------------------------------------------------------------
// Log rotation
// ---------------------------------------------------------------------------

/// Directory for rolling log files.
pub fn get_log_dir() -> PathBuf {
    let base = std::env::var("LOCALAPPDATA")
        .or_else(|_| std::env::var("XDG_DATA_HOME"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            #[cfg(target_os = "windows")]
            {
                PathBuf::from(std::env::var("USERPROFILE").unwrap_or_else(|_| ".".into()))
                    .join("AppData")
                    .join("Local")
            }
            #[cfg(not(target_os = "windows"))]
            {
                PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()))
                    .join(".local")
                    .join("share")
            }
        });
    base.join("com.topanimebar.otakupos").join("logs")
}

/// Delete the oldest log files beyond `MAX_LOG_FILES`.
pub fn prune_old_logs() {
    let log_dir = get_log_dir();
    if !log_dir.exists() {
        return;
    }

    let mut log_files: Vec<(PathBuf, std::time::SystemTime)> = Vec::new();
    if let Ok(entries) = fs::read_dir(&log_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    if name.starts_with("pos.") || name == "pos.log" {
                        let modified = entry
                            .metadata()
                            .ok()
                            .and_then(|m| m.modified().ok())
                            .unwrap_or(std::time::UNIX_EPOCH);
                        log_files.push((path, modified));
                    }
                }
            }
        }
    }

    // Sort newest first
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    // Remove files beyond the limit
    for (path, _) in log_files.iter().skip(MAX_LOG_FILES) {
        if let Err(e) = fs::remove_file(path) {
            warn!("Failed to prune log file {}: {e}", path.display());
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
