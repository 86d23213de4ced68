use crate::receipt_renderer::BusinessInfo;
use crate::{db, storage, value_str};

#[tauri::command]
pub async fn settings_get(
    arg0: Option<serde_json::Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<serde_json::Value, String> {
    let payload = arg0.ok_or("Missing payload")?;
    let category = value_str(&payload, &["category"]).unwrap_or_else(|| "terminal".to_string());
    let key = value_str(&payload, &["key"]).ok_or("Missing key")?;

    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    Ok(match db::get_setting(&conn, &category, &key) {
        Some(value) => serde_json::Value::String(value),
        None => serde_json::Value::Null,
    })
}

#[tauri::command]
pub async fn settings_set(
    arg0: Option<serde_json::Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<serde_json::Value, String> {
    let payload = arg0.ok_or("Missing payload")?;
    let category = value_str(&payload, &["category"]).unwrap_or_else(|| "terminal".to_string());
    let key = value_str(&payload, &["key"]).ok_or("Missing key")?;
    let value = value_str(&payload, &["value"]).ok_or("Missing value")?;

    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    db::set_setting(&conn, &category, &key, &value)?;
    Ok(serde_json::json!({ "success": true }))
}

#[tauri::command]
pub async fn settings_get_business_info(
    db: tauri::State<'_, db::DbState>,
) -> Result<serde_json::Value, String> {
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    serde_json::to_value(BusinessInfo::from_settings(&conn)).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn settings_set_business_info(
    arg0: Option<serde_json::Value>,
    db: tauri::State<'_, db::DbState>,
) -> Result<serde_json::Value, String> {
    let payload = arg0.ok_or("Missing payload")?;
    let conn = db.conn.lock().map_err(|e| e.to_string())?;

    for (key, field) in [
        ("store_name", "name"),
        ("store_address", "address"),
        ("store_city", "city"),
        ("store_country", "country"),
        ("store_phone", "phone"),
        ("rnc", "rnc"),
    ] {
        if let Some(value) = value_str(&payload, &[field, key]) {
            db::set_setting(&conn, "business", key, &value)?;
        }
    }
    Ok(serde_json::json!({ "success": true }))
}

#[tauri::command]
pub async fn settings_factory_reset(
    db: tauri::State<'_, db::DbState>,
) -> Result<serde_json::Value, String> {
    storage::factory_reset()?;
    let conn = db.conn.lock().map_err(|e| e.to_string())?;
    for category in ["business", "terminal"] {
        db::delete_all_settings(&conn, category)?;
    }
    Ok(serde_json::json!({ "success": true }))
}
