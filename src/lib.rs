pub mod app;

use tauri::{DragDropEvent, Manager, WindowEvent};
use tracing::{info, warn};
use uuid::Uuid;

use app::commands::{
    cancel_operation, get_config, handle_dropped_paths, install_apks, load_apps, uninstall_app,
};
use app::config::{load_or_init_config, AppConfig};
use app::context::AppContext;
use app::logging::init_logging;
use app::state::AppState;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let trace_id = Uuid::new_v4().to_string();
    let loaded = load_or_init_config(&trace_id);
    let level = loaded
        .as_ref()
        .map(|config| config.logging.log_level.clone())
        .unwrap_or_else(|_| AppConfig::default().logging.log_level);
    init_logging(&level);

    let config = loaded.unwrap_or_else(|err| {
        warn!(trace_id = %trace_id, error = %err, "failed to load config, using defaults");
        AppConfig::default()
    });
    info!(trace_id = %trace_id, "starting ADB Manager");
    let context = AppContext::from_config(config, &trace_id);

    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .manage(AppState::new(context))
        .on_window_event(|window, event| {
            if let WindowEvent::DragDrop(DragDropEvent::Drop { paths, .. }) = event {
                handle_dropped_paths(window.app_handle(), paths.clone());
            }
        })
        .invoke_handler(tauri::generate_handler![
            get_config,
            load_apps,
            uninstall_app,
            install_apks,
            cancel_operation
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
