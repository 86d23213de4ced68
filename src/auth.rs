//! Employee login for OTAKU POS.
//!
//! Staff authenticate with a short access code checked against a bcrypt
//! hash in the `employees` table. The logged-in employee is held in-memory
//! as Tauri managed state; shift status itself lives on the employee row.

use serde_json::Value;
use std::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::DbState;
use crate::error::{PosError, PosResult};
use crate::shifts;

/// Tauri managed state for the current session.
#[derive(Default)]
pub struct AuthState {
    current_employee_id: Mutex<Option<String>>,
}

impl AuthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_employee_id(&self) -> Option<String> {
        self.current_employee_id.lock().ok()?.clone()
    }

    fn set_current(&self, employee_id: Option<String>) {
        if let Ok(mut current) = self.current_employee_id.lock() {
            *current = employee_id;
        }
    }
}

// ---------------------------------------------------------------------------
// Login / logout
// ---------------------------------------------------------------------------

/// Authenticate an access code against the employee table.
pub fn login(db: &DbState, auth: &AuthState, code: &str) -> PosResult<Value> {
    let code = code.trim();
    if code.is_empty() {
        return Err(PosError::validation("Please enter your employee code"));
    }

    let candidates: Vec<(String, String)> = {
        let conn = db
            .conn
            .lock()
            .map_err(|e| PosError::Database(e.to_string()))?;
        let mut stmt = conn.prepare("SELECT id, code_hash FROM employees")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.filter_map(|r| r.ok()).collect()
    };

    for (employee_id, code_hash) in candidates {
        if bcrypt::verify(code, &code_hash).unwrap_or(false) {
            auth.set_current(Some(employee_id.clone()));
            info!(employee_id = %employee_id, "Employee logged in");
            let employee = shifts::get_employee(db, &employee_id)?
                .ok_or_else(|| PosError::Database("employee row vanished".into()))?;
            return Ok(serde_json::json!({ "success": true, "employee": employee }));
        }
    }

    warn!("Login attempt with invalid employee code");
    Err(PosError::validation("Invalid employee code"))
}

/// Clear the session. Shift state is untouched; ending a shift is a
/// separate, guarded operation.
pub fn logout(auth: &AuthState) -> Value {
    auth.set_current(None);
    serde_json::json!({ "success": true })
}

/// The logged-in employee row, or null.
pub fn current_employee(db: &DbState, auth: &AuthState) -> PosResult<Value> {
    match auth.current_employee_id() {
        Some(id) => Ok(shifts::get_employee(db, &id)?.unwrap_or(Value::Null)),
        None => Ok(Value::Null),
    }
}

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

/// Demo staff seeded on first run (code in parentheses only exists as a
/// bcrypt hash).
const DEFAULT_EMPLOYEES: &[(&str, &str)] = &[("Maria", "1234"), ("Pedro", "5678")];

/// Seed demo employees when the table is empty. Idempotent.
pub fn seed_default_employees(db: &DbState) -> PosResult<usize> {
    let conn = db
        .conn
        .lock()
        .map_err(|e| PosError::Database(e.to_string()))?;
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM employees", [], |row| row.get(0))?;
    if count > 0 {
        return Ok(0);
    }

    let mut inserted = 0usize;
    for (name, code) in DEFAULT_EMPLOYEES {
        let hash = bcrypt::hash(code, bcrypt::DEFAULT_COST)
            .map_err(|e| PosError::Database(format!("hash employee code: {e}")))?;
        conn.execute(
            "INSERT INTO employees (id, name, code_hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'), datetime('now'))",
            rusqlite::params![Uuid::new_v4().to_string(), name, hash],
        )?;
        inserted += 1;
    }

    info!(count = inserted, "Seeded default employees");
    Ok(inserted)
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

    fn insert_employee(db: &DbState, id: &str, name: &str, code: &str) {
        // Low cost keeps the test fast; production seeding uses DEFAULT_COST
        let hash = bcrypt::hash(code, 4).unwrap();
        let conn = db.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO employees (id, name, code_hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'), datetime('now'))",
            rusqlite::params![id, name, hash],
        )
        .unwrap();
    }

    #[test]
    fn test_login_with_valid_code() {
        let db = test_db();
        let auth = AuthState::new();
        insert_employee(&db, "emp-1", "Maria", "1234");

        let result = login(&db, &auth, "1234").expect("login");
        assert_eq!(result["employee"]["name"], "Maria");
        assert_eq!(auth.current_employee_id().as_deref(), Some("emp-1"));
    }

    #[test]
    fn test_login_rejects_wrong_or_empty_code() {
        let db = test_db();
        let auth = AuthState::new();
        insert_employee(&db, "emp-1", "Maria", "1234");

        let err = login(&db, &auth, "9999").unwrap_err();
        assert_eq!(err.to_string(), "Invalid employee code");
        assert!(auth.current_employee_id().is_none());

        let err = login(&db, &auth, "  ").unwrap_err();
        assert_eq!(err.to_string(), "Please enter your employee code");
    }

    #[test]
    fn test_logout_clears_session() {
        let db = test_db();
        let auth = AuthState::new();
        insert_employee(&db, "emp-1", "Maria", "1234");
        login(&db, &auth, "1234").unwrap();

        logout(&auth);
        assert!(auth.current_employee_id().is_none());
        assert_eq!(current_employee(&db, &auth).unwrap(), Value::Null);
    }

    #[test]
    fn test_distinct_codes_resolve_distinct_employees() {
        let db = test_db();
        let auth = AuthState::new();
        insert_employee(&db, "emp-1", "Maria", "1234");
        insert_employee(&db, "emp-2", "Pedro", "5678");

        login(&db, &auth, "5678").unwrap();
        assert_eq!(auth.current_employee_id().as_deref(), Some("emp-2"));
    }
}
