use tauri::Emitter;

use crate::{db, ocr, storage, value_str};

fn parse_text(arg0: Option<serde_json::Value>) -> Result<String, String> {
    match arg0 {
        Some(serde_json::Value::String(text)) => Ok(text),
        Some(value) => value_str(&value, &["text", "ocrText", "processed_text"])
            .ok_or_else(|| "Missing recognized text".to_string()),
        None => Err("Missing recognized text".to_string()),
    }
}

fn parse_invoice_id(arg0: &Option<serde_json::Value>) -> Result<String, String> {
    match arg0 {
        Some(serde_json::Value::String(id)) => Ok(id.clone()),
        Some(value) => value_str(value, &["id", "invoiceId", "invoice_id"])
            .ok_or_else(|| "Missing invoice id".to_string()),
        None => Err("Missing invoice id".to_string()),
    }
}

#[tauri::command]
pub async fn ocr_extract_fields(
    arg0: Option<serde_json::Value>,
) -> Result<serde_json::Value, String> {
    let text = parse_text(arg0)?;
    let invoice = ocr::extract_invoice_fields(&text);
    serde_json::to_value(&invoice).map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn ocr_extract_fields_ai(
    arg0: Option<serde_json::Value>,
) -> Result<serde_json::Value, String> {
    let text = parse_text(arg0)?;
    let (invoice, source) = ocr::extract_invoice_fields_ai(&text).await;
    let mut result = serde_json::to_value(&invoice).map_err(|e| e.to_string())?;
    if let Some(obj) = result.as_object_mut() {
        obj.insert("source".into(), serde_json::json!(source));
    }
    Ok(result)
}

#[tauri::command]
pub async fn ocr_save_invoice(
    arg0: Option<serde_json::Value>,
    db: tauri::State<'_, db::DbState>,
    app: tauri::AppHandle,
) -> Result<serde_json::Value, String> {
    let payload = arg0.ok_or("Missing invoice payload")?;
    let result = ocr::save_ocr_invoice(&db, &payload).map_err(String::from)?;
    let _ = app.emit("ocr_invoices_changed", serde_json::json!({ "action": "create" }));
    Ok(result)
}

#[tauri::command]
pub async fn ocr_list_pending_invoices(
    db: tauri::State<'_, db::DbState>,
) -> Result<serde_json::Value, String> {
    ocr::list_pending_ocr_invoices(&db).map_err(String::from)
}

#[tauri::command]
pub async fn ocr_update_invoice(
    arg0: Option<serde_json::Value>,
    db: tauri::State<'_, db::DbState>,
    app: tauri::AppHandle,
) -> Result<serde_json::Value, String> {
    let payload = arg0.ok_or("Missing invoice payload")?;
    let invoice_id = value_str(&payload, &["id", "invoiceId", "invoice_id"])
        .ok_or("Missing invoice id")?;
    let result = ocr::update_ocr_invoice(&db, &invoice_id, &payload).map_err(String::from)?;
    let _ = app.emit("ocr_invoices_changed", serde_json::json!({ "action": "update" }));
    Ok(result)
}

#[tauri::command]
pub async fn ocr_import_invoice(
    arg0: Option<serde_json::Value>,
    db: tauri::State<'_, db::DbState>,
    app: tauri::AppHandle,
) -> Result<serde_json::Value, String> {
    let invoice_id = parse_invoice_id(&arg0)?;
    let result = ocr::import_ocr_invoice(&db, &invoice_id).map_err(String::from)?;
    let _ = app.emit("ocr_invoices_changed", serde_json::json!({ "action": "import" }));
    let _ = app.emit("expenses_changed", serde_json::json!({ "action": "create" }));
    Ok(result)
}

#[tauri::command]
pub async fn ocr_delete_invoice(
    arg0: Option<serde_json::Value>,
    db: tauri::State<'_, db::DbState>,
    app: tauri::AppHandle,
) -> Result<serde_json::Value, String> {
    let invoice_id = parse_invoice_id(&arg0)?;
    let result = ocr::delete_ocr_invoice(&db, &invoice_id).map_err(String::from)?;
    let _ = app.emit("ocr_invoices_changed", serde_json::json!({ "action": "delete" }));
    Ok(result)
}

#[tauri::command]
pub async fn ocr_list_expenses(
    db: tauri::State<'_, db::DbState>,
) -> Result<serde_json::Value, String> {
    ocr::list_expenses(&db).map_err(String::from)
}

#[tauri::command]
pub async fn ocr_set_extraction_credentials(
    arg0: Option<serde_json::Value>,
) -> Result<serde_json::Value, String> {
    let payload = arg0.ok_or("Missing credentials payload")?;
    let endpoint = value_str(&payload, &["endpoint", "url"]).ok_or("Missing endpoint")?;
    let api_key = value_str(&payload, &["apiKey", "api_key", "key"]).ok_or("Missing API key")?;
    storage::set_extraction_credentials(&endpoint, &api_key)?;
    Ok(serde_json::json!({ "success": true }))
}

#[tauri::command]
pub async fn ocr_extraction_is_configured() -> Result<serde_json::Value, String> {
    Ok(serde_json::json!({ "configured": storage::extraction_is_configured() }))
}
