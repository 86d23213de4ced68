use tauri::Emitter;

use crate::{auth, db, shifts, value_f64};

fn current_employee_id(auth_state: &auth::AuthState) -> Result<String, String> {
    auth_state
        .current_employee_id()
        .ok_or_else(|| "Please log in first".to_string())
}

#[tauri::command]
pub async fn shift_start(
    arg0: Option<serde_json::Value>,
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
    app: tauri::AppHandle,
) -> Result<serde_json::Value, String> {
    let employee_id = current_employee_id(&auth_state)?;
    let opening_cash = match &arg0 {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(-1.0),
        Some(value) => value_f64(
            value,
            &["openingCash", "opening_cash", "amount", "startingAmount"],
        )
        .unwrap_or(-1.0),
        None => -1.0,
    };

    let result = shifts::start_shift(&db, &employee_id, opening_cash).map_err(String::from)?;
    let _ = app.emit("employees_changed", serde_json::json!({ "action": "shift_start" }));
    Ok(result)
}

#[tauri::command]
pub async fn shift_end(
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
    app: tauri::AppHandle,
) -> Result<serde_json::Value, String> {
    let employee_id = current_employee_id(&auth_state)?;
    let result = shifts::end_shift(&db, &employee_id).map_err(String::from)?;

    // Ending the shift ends the session too
    auth::logout(&auth_state);
    let _ = app.emit("employees_changed", serde_json::json!({ "action": "shift_end" }));
    Ok(result)
}

#[tauri::command]
pub async fn shift_get_summary(
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
) -> Result<serde_json::Value, String> {
    let employee_id = current_employee_id(&auth_state)?;
    shifts::shift_summary(&db, &employee_id).map_err(String::from)
}
