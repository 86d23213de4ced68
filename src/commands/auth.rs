use crate::{auth, db};

/// Extract the access code from arg0, which may be a bare string or
/// `{"code":"1234"}`.
fn parse_code(arg0: Option<serde_json::Value>) -> Result<String, String> {
    match arg0 {
        Some(serde_json::Value::String(code)) => Ok(code),
        Some(value) => value
            .get("code")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| "Missing employee code".to_string()),
        None => Err("Missing employee code".to_string()),
    }
}

#[tauri::command]
pub async fn auth_login(
    arg0: Option<serde_json::Value>,
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
) -> Result<serde_json::Value, String> {
    let code = parse_code(arg0)?;
    auth::login(&db, &auth_state, &code).map_err(String::from)
}

#[tauri::command]
pub async fn auth_logout(
    auth_state: tauri::State<'_, auth::AuthState>,
) -> Result<serde_json::Value, String> {
    Ok(auth::logout(&auth_state))
}

#[tauri::command]
pub async fn auth_get_current_employee(
    db: tauri::State<'_, db::DbState>,
    auth_state: tauri::State<'_, auth::AuthState>,
) -> Result<serde_json::Value, String> {
    auth::current_employee(&db, &auth_state).map_err(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_code_shapes() {
        assert_eq!(
            parse_code(Some(serde_json::json!("1234"))).unwrap(),
            "1234"
        );
        assert_eq!(
            parse_code(Some(serde_json::json!({ "code": "5678" }))).unwrap(),
            "5678"
        );
        assert!(parse_code(None).is_err());
        assert!(parse_code(Some(serde_json::json!({}))).is_err());
    }
}
