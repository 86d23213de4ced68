use std::sync::atomic::Ordering;

use crate::{db, diagnostics, APP_START_EPOCH};

#[tauri::command]
pub async fn app_get_version() -> Result<serde_json::Value, String> {
    Ok(serde_json::json!({ "version": env!("CARGO_PKG_VERSION") }))
}

#[tauri::command]
pub async fn diagnostics_get_about() -> Result<serde_json::Value, String> {
    let mut about = diagnostics::get_about_info();
    let started = APP_START_EPOCH.load(Ordering::Relaxed);
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    if let Some(obj) = about.as_object_mut() {
        obj.insert(
            "uptimeSeconds".into(),
            serde_json::json!(now.saturating_sub(started)),
        );
    }
    Ok(about)
}

#[tauri::command]
pub async fn database_health_check(
    db: tauri::State<'_, db::DbState>,
) -> Result<serde_json::Value, String> {
    diagnostics::database_health_check(&db).map_err(String::from)
}

#[tauri::command]
pub async fn database_get_stats(
    db: tauri::State<'_, db::DbState>,
) -> Result<serde_json::Value, String> {
    diagnostics::get_database_stats(&db).map_err(String::from)
}
