use tauri::Emitter;

use crate::{db, menu, value_str};

fn parse_item_id(arg0: &Option<serde_json::Value>) -> Result<String, String> {
    match arg0 {
        Some(serde_json::Value::String(id)) => Ok(id.clone()),
        Some(value) => value_str(value, &["id", "itemId", "item_id"])
            .ok_or_else(|| "Missing item id".to_string()),
        None => Err("Missing item id".to_string()),
    }
}

#[tauri::command]
pub async fn menu_get_items(
    db: tauri::State<'_, db::DbState>,
) -> Result<serde_json::Value, String> {
    menu::list_menu_items(&db).map_err(String::from)
}

#[tauri::command]
pub async fn menu_create_item(
    arg0: Option<serde_json::Value>,
    db: tauri::State<'_, db::DbState>,
    app: tauri::AppHandle,
) -> Result<serde_json::Value, String> {
    let payload = arg0.ok_or("Missing menu item payload")?;
    let result = menu::create_menu_item(&db, &payload).map_err(String::from)?;
    let _ = app.emit("menu_changed", serde_json::json!({ "action": "create" }));
    Ok(result)
}

#[tauri::command]
pub async fn menu_update_item(
    arg0: Option<serde_json::Value>,
    db: tauri::State<'_, db::DbState>,
    app: tauri::AppHandle,
) -> Result<serde_json::Value, String> {
    let payload = arg0.ok_or("Missing menu item payload")?;
    let item_id = value_str(&payload, &["id", "itemId", "item_id"]).ok_or("Missing item id")?;
    let result = menu::update_menu_item(&db, &item_id, &payload).map_err(String::from)?;
    let _ = app.emit("menu_changed", serde_json::json!({ "action": "update" }));
    Ok(result)
}

#[tauri::command]
pub async fn menu_delete_item(
    arg0: Option<serde_json::Value>,
    db: tauri::State<'_, db::DbState>,
    app: tauri::AppHandle,
) -> Result<serde_json::Value, String> {
    let item_id = parse_item_id(&arg0)?;
    let result = menu::delete_menu_item(&db, &item_id).map_err(String::from)?;
    let _ = app.emit("menu_changed", serde_json::json!({ "action": "delete" }));
    Ok(result)
}
