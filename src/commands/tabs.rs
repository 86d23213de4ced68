use crate::{auth, db, tabs, value_f64, value_i64, value_str};

fn parse_tab_id(arg0: &Option<serde_json::Value>) -> Result<String, String> {
    match arg0 {
        Some(serde_json::Value::String(id)) => Ok(id.clone()),
        Some(value) => {
            value_str(value, &["tabId", "tab_id", "id"]).ok_or_else(|| "Missing tab id".to_string())
        }
        None => Err("Missing tab id".to_string()),
    }
}

#[tauri::command]
pub async fn tab_create(
    db: tauri::State<'_, db::DbState>,
    tab_state: tauri::State<'_, tabs::TabState>,
    auth_state: tauri::State<'_, auth::AuthState>,
) -> Result<serde_json::Value, String> {
    let employee_id = auth_state.current_employee_id();
    tabs::create_tab(&db, &tab_state, employee_id.as_deref()).map_err(String::from)
}

#[tauri::command]
pub async fn tab_list(
    tab_state: tauri::State<'_, tabs::TabState>,
) -> Result<serde_json::Value, String> {
    tabs::list_tabs(&tab_state).map_err(String::from)
}

#[tauri::command]
pub async fn tab_select(
    arg0: Option<serde_json::Value>,
    tab_state: tauri::State<'_, tabs::TabState>,
) -> Result<serde_json::Value, String> {
    let tab_id = parse_tab_id(&arg0)?;
    tabs::select_tab(&tab_state, &tab_id).map_err(String::from)
}

#[tauri::command]
pub async fn tab_update(
    arg0: Option<serde_json::Value>,
    tab_state: tauri::State<'_, tabs::TabState>,
) -> Result<serde_json::Value, String> {
    let payload = arg0.ok_or("Missing tab payload")?;
    let tab_id = value_str(&payload, &["tabId", "tab_id", "id"]).ok_or("Missing tab id")?;
    tabs::update_tab(&tab_state, &tab_id, &payload).map_err(String::from)
}

#[tauri::command]
pub async fn tab_close(
    arg0: Option<serde_json::Value>,
    tab_state: tauri::State<'_, tabs::TabState>,
) -> Result<serde_json::Value, String> {
    let tab_id = parse_tab_id(&arg0)?;
    tabs::close_tab(&tab_state, &tab_id).map_err(String::from)
}

#[tauri::command]
pub async fn tab_add_item(
    arg0: Option<serde_json::Value>,
    db: tauri::State<'_, db::DbState>,
    tab_state: tauri::State<'_, tabs::TabState>,
    auth_state: tauri::State<'_, auth::AuthState>,
    app: tauri::AppHandle,
) -> Result<serde_json::Value, String> {
    use tauri::Emitter;

    let item_id = match &arg0 {
        Some(serde_json::Value::String(id)) => id.clone(),
        Some(value) => {
            value_str(value, &["itemId", "item_id", "id"]).ok_or("Missing item id")?
        }
        None => return Err("Missing item id".to_string()),
    };

    let employee_id = auth_state.current_employee_id();
    let result =
        tabs::add_item(&db, &tab_state, employee_id.as_deref(), &item_id).map_err(String::from)?;
    let _ = app.emit("orders_changed", serde_json::json!({ "action": "create" }));
    Ok(result)
}

#[tauri::command]
pub async fn tab_update_quantity(
    arg0: Option<serde_json::Value>,
    tab_state: tauri::State<'_, tabs::TabState>,
) -> Result<serde_json::Value, String> {
    let payload = arg0.ok_or("Missing payload")?;
    let tab_id = value_str(&payload, &["tabId", "tab_id"]).ok_or("Missing tab id")?;
    let item_id = value_str(&payload, &["itemId", "item_id"]).ok_or("Missing item id")?;
    let quantity = value_i64(&payload, &["quantity"]).ok_or("Missing quantity")?;
    tabs::update_quantity(&tab_state, &tab_id, &item_id, quantity).map_err(String::from)
}

#[tauri::command]
pub async fn tab_remove_item(
    arg0: Option<serde_json::Value>,
    tab_state: tauri::State<'_, tabs::TabState>,
) -> Result<serde_json::Value, String> {
    let payload = arg0.ok_or("Missing payload")?;
    let tab_id = value_str(&payload, &["tabId", "tab_id"]).ok_or("Missing tab id")?;
    let item_id = value_str(&payload, &["itemId", "item_id"]).ok_or("Missing item id")?;
    tabs::remove_item(&tab_state, &tab_id, &item_id).map_err(String::from)
}

#[tauri::command]
pub async fn tab_get_totals(
    arg0: Option<serde_json::Value>,
    db: tauri::State<'_, db::DbState>,
    tab_state: tauri::State<'_, tabs::TabState>,
) -> Result<serde_json::Value, String> {
    let payload = arg0.ok_or("Missing payload")?;
    let tab_id = value_str(&payload, &["tabId", "tab_id", "id"]).ok_or("Missing tab id")?;
    let discount = value_f64(&payload, &["discountPercent", "discount_percent", "discount"])
        .unwrap_or(0.0);
    tabs::tab_totals(&db, &tab_state, &tab_id, discount).map_err(String::from)
}
