#![recursion_limit = "256"]

//! OTAKU POS - Tauri v2 Backend
//!
//! Registers the IPC command handlers the React frontend calls via
//! `@tauri-apps/api/core::invoke()`. The backend owns the SQLite store,
//! the session tab state, and the fulfillment completion set; every
//! mutating command emits a change event (`orders_changed`, `menu_changed`,
//! `employees_changed`, ...) and the views re-fetch their query on each one.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// App start time for uptime calculation (epoch seconds).
pub(crate) static APP_START_EPOCH: AtomicU64 = AtomicU64::new(0);

mod api;
mod auth;
mod commands;
mod db;
mod diagnostics;
mod error;
mod menu;
mod ocr;
mod orders;
mod payments;
mod receipt_renderer;
mod reports;
mod shifts;
mod storage;
mod tabs;
mod totals;

// ---------------------------------------------------------------------------
// Payload helpers shared by the command modules
// ---------------------------------------------------------------------------

pub(crate) fn value_str(v: &serde_json::Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(s) = v.get(*key).and_then(|x| x.as_str()) {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

pub(crate) fn value_f64(v: &serde_json::Value, keys: &[&str]) -> Option<f64> {
    for key in keys {
        if let Some(n) = v.get(*key).and_then(|x| x.as_f64()) {
            return Some(n);
        }
    }
    None
}

pub(crate) fn value_i64(v: &serde_json::Value, keys: &[&str]) -> Option<i64> {
    for key in keys {
        if let Some(n) = v.get(*key).and_then(|x| x.as_i64()) {
            return Some(n);
        }
    }
    None
}

// ============================================================================
// App entry point
// ============================================================================

pub fn run() {
    // Record start time for uptime tracking
    let epoch = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    APP_START_EPOCH.store(epoch, Ordering::Relaxed);

    // Initialize structured logging (console + rolling file)
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,otaku_pos_lib=debug"));

    // Prune old log files before setting up the appender
    diagnostics::prune_old_logs();

    // Rolling file appender: creates daily log files in the logs directory
    let log_dir = diagnostics::get_log_dir();
    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(&log_dir, "pos");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);
    let console_layer = fmt::layer().with_target(true);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    // Keep the guard alive for the lifetime of the app — dropping it flushes logs.
    // We leak it intentionally since the app runs until process exit.
    std::mem::forget(_guard);

    info!("Starting OTAKU POS v{}", env!("CARGO_PKG_VERSION"));

    tauri::Builder::default()
        .setup(|app| {
            use tauri::Manager;

            let app_data_dir = app
                .path()
                .app_data_dir()
                .expect("Failed to get app data dir");

            let db_state = db::init(&app_data_dir).expect("Failed to initialize database");

            // First-run seeding: house menu and demo staff
            if let Err(e) = menu::seed_default_menu(&db_state) {
                tracing::warn!(error = %e, "Menu seed failed");
            }
            if let Err(e) = auth::seed_default_employees(&db_state) {
                tracing::warn!(error = %e, "Employee seed failed");
            }

            app.manage(db_state);
            app.manage(auth::AuthState::new());
            app.manage(tabs::TabState::new());
            app.manage(orders::CompletionState::new());

            info!("Database, auth, tabs, and completion state registered");
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // App lifecycle / diagnostics
            commands::runtime::app_get_version,
            commands::runtime::diagnostics_get_about,
            commands::runtime::database_health_check,
            commands::runtime::database_get_stats,
            // Auth
            commands::auth::auth_login,
            commands::auth::auth_logout,
            commands::auth::auth_get_current_employee,
            // Menu
            commands::menu::menu_get_items,
            commands::menu::menu_create_item,
            commands::menu::menu_update_item,
            commands::menu::menu_delete_item,
            // Tabs
            commands::tabs::tab_create,
            commands::tabs::tab_list,
            commands::tabs::tab_select,
            commands::tabs::tab_update,
            commands::tabs::tab_close,
            commands::tabs::tab_add_item,
            commands::tabs::tab_update_quantity,
            commands::tabs::tab_remove_item,
            commands::tabs::tab_get_totals,
            // Fulfillment boards
            commands::orders::orders_get_station_board,
            commands::orders::order_toggle_item_complete,
            commands::orders::orders_clear_all,
            // Shifts
            commands::shifts::shift_start,
            commands::shifts::shift_end,
            commands::shifts::shift_get_summary,
            // Payments / receipts
            commands::payments::payment_settle_tab,
            commands::payments::payment_get_receipts,
            commands::payments::payment_get_receipt_preview,
            // Reports
            commands::reports::report_get_sales_history,
            commands::reports::report_generate_607,
            commands::reports::report_generate_606,
            // OCR invoice capture
            commands::ocr::ocr_extract_fields,
            commands::ocr::ocr_extract_fields_ai,
            commands::ocr::ocr_save_invoice,
            commands::ocr::ocr_list_pending_invoices,
            commands::ocr::ocr_update_invoice,
            commands::ocr::ocr_import_invoice,
            commands::ocr::ocr_delete_invoice,
            commands::ocr::ocr_list_expenses,
            commands::ocr::ocr_set_extraction_credentials,
            commands::ocr::ocr_extraction_is_configured,
            // Settings
            commands::settings::settings_get,
            commands::settings::settings_set,
            commands::settings::settings_get_business_info,
            commands::settings::settings_set_business_info,
            commands::settings::settings_factory_reset,
        ])
        .run(tauri::generate_context!())
        .expect("error while running OTAKU POS")
}
