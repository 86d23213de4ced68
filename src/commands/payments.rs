use tauri::Emitter;

use crate::{auth, db, payments, tabs, value_f64, value_str};

#[tauri::command]
pub async fn payment_settle_tab(
    arg0: Option<serde_json::Value>,
    db: tauri::State<'_, db::DbState>,
    tab_state: tauri::State<'_, tabs::TabState>,
    auth_state: tauri::State<'_, auth::AuthState>,
    app: tauri::AppHandle,
) -> Result<serde_json::Value, String> {
    let payload = arg0.ok_or("Missing payment payload")?;
    let employee_id = auth_state.current_employee_id();
    let result = payments::settle_tab(&db, &tab_state, employee_id.as_deref(), &payload)
        .map_err(String::from)?;

    let _ = app.emit("receipts_changed", serde_json::json!({ "action": "create" }));
    let _ = app.emit("employees_changed", serde_json::json!({ "action": "sale" }));
    Ok(result)
}

#[tauri::command]
pub async fn payment_get_receipts(
    arg0: Option<serde_json::Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<serde_json::Value, String> {
    let payload = arg0.unwrap_or(serde_json::Value::Null);
    let employee_id = value_str(&payload, &["employeeId", "employee_id"]);
    let since = value_str(&payload, &["since"]);
    payments::list_receipts(&db, employee_id.as_deref(), since.as_deref()).map_err(String::from)
}

#[tauri::command]
pub async fn payment_get_receipt_preview(
    arg0: Option<serde_json::Value>,
    db: tauri::State<'_, db::DbState>,
    tab_state: tauri::State<'_, tabs::TabState>,
) -> Result<serde_json::Value, String> {
    let payload = arg0.ok_or("Missing payload")?;
    let tab_id = value_str(&payload, &["tabId", "tab_id", "id"]).ok_or("Missing tab id")?;
    let discount = value_f64(&payload, &["discountPercent", "discount_percent", "discount"])
        .unwrap_or(0.0);
    let method = value_str(&payload, &["method", "paymentMethod", "payment_method"]);
    payments::tab_receipt_preview(&db, &tab_state, &tab_id, discount, method.as_deref())
        .map_err(String::from)
}
