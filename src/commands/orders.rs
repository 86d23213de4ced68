use tauri::Emitter;

use crate::menu::Station;
use crate::{db, orders, value_str};

fn parse_station(value: &serde_json::Value) -> Result<Station, String> {
    let raw = match value {
        serde_json::Value::String(s) => s.clone(),
        other => value_str(other, &["station"]).ok_or("Missing station")?,
    };
    Station::parse(&raw).map_err(String::from)
}

#[tauri::command]
pub async fn orders_get_station_board(
    arg0: Option<serde_json::Value>,
    db: tauri::State<'_, db::DbState>,
    completion: tauri::State<'_, orders::CompletionState>,
) -> Result<serde_json::Value, String> {
    let station = parse_station(&arg0.ok_or("Missing station")?)?;
    orders::list_station_orders(&db, &completion, station).map_err(String::from)
}

#[tauri::command]
pub async fn order_toggle_item_complete(
    arg0: Option<serde_json::Value>,
    db: tauri::State<'_, db::DbState>,
    completion: tauri::State<'_, orders::CompletionState>,
    app: tauri::AppHandle,
) -> Result<serde_json::Value, String> {
    let payload = arg0.ok_or("Missing payload")?;
    let station = parse_station(&payload)?;
    let order_id = value_str(&payload, &["orderId", "order_id"]).ok_or("Missing order id")?;
    let menu_item_id =
        value_str(&payload, &["menuItemId", "menu_item_id", "itemId"]).ok_or("Missing item id")?;

    let result = orders::toggle_item_complete(&db, &completion, station, &order_id, &menu_item_id)
        .map_err(String::from)?;

    if result["status_updated"] == true {
        let _ = app.emit(
            "orders_changed",
            serde_json::json!({ "action": "status", "order_id": order_id }),
        );
    }
    Ok(result)
}

#[tauri::command]
pub async fn orders_clear_all(
    db: tauri::State<'_, db::DbState>,
    completion: tauri::State<'_, orders::CompletionState>,
    app: tauri::AppHandle,
) -> Result<serde_json::Value, String> {
    let result = orders::clear_all_orders(&db, &completion).map_err(String::from)?;
    let _ = app.emit("orders_changed", serde_json::json!({ "action": "clear" }));
    let _ = app.emit("employees_changed", serde_json::json!({ "action": "reset" }));
    Ok(result)
}
