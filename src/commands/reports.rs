use crate::{auth, db, reports, value_str};

#[tauri::command]
pub async fn report_get_sales_history(
    arg0: Option<serde_json::Value>,
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
) -> Result<serde_json::Value, String> {
    let payload = arg0.unwrap_or(serde_json::Value::Null);
    let timeframe = value_str(&payload, &["timeframe"]).unwrap_or_else(|| "week".to_string());
    // Default scope is the logged-in employee, matching the sales view
    let employee_id = value_str(&payload, &["employeeId", "employee_id"])
        .or_else(|| auth_state.current_employee_id());
    reports::sales_history(&db, employee_id.as_deref(), &timeframe).map_err(String::from)
}

fn parse_period(arg0: Option<serde_json::Value>) -> Result<String, String> {
    match arg0 {
        Some(serde_json::Value::String(period)) => Ok(period),
        Some(value) => value_str(&value, &["period", "month", "reportMonth"])
            .ok_or_else(|| "Missing period".to_string()),
        None => Err("Missing period".to_string()),
    }
}

#[tauri::command]
pub async fn report_generate_607(
    arg0: Option<serde_json::Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<serde_json::Value, String> {
    let period = parse_period(arg0)?;
    reports::generate_report_607(&db, &period).map_err(String::from)
}

#[tauri::command]
pub async fn report_generate_606(
    arg0: Option<serde_json::Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<serde_json::Value, String> {
    let period = parse_period(arg0)?;
    reports::generate_report_606(&db, &period).map_err(String::from)
}
