use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

use tauri::{AppHandle, Manager, State};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::app::bridge::{TauriDialogs, TauriEvents};
use crate::app::config::AppConfig;
use crate::app::error::AppError;
use crate::app::models::{CommandResponse, NoticeLevel, OperationKind, OperationTicket};
use crate::app::state::AppState;
use crate::app::workflow::{dropped_apks, EventSink, Notifier, OperationScope};


fn resolve_trace_id(input: Option<String>) -> String {
    input
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn ensure_non_empty(value: &str, field: &str, trace_id: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(
            format!("{field} is required"),
            trace_id,
        ));
    }
    Ok(())
}

fn start_operation<F>(
    state: &AppState,
    kind: OperationKind,
    trace_id: &str,
    events: Arc<dyn EventSink>,
    notifier: Arc<dyn Notifier>,
    work: F,
) -> Result<(OperationTicket, JoinHandle<()>), AppError>
where
    F: FnOnce(&OperationScope<'_>) + Send + 'static,
{
    let guard = state.operations.try_begin(kind.clone(), trace_id)?;
    let ticket = OperationTicket {
        operation_id: guard.id().to_string(),
        operation: kind,
    };
    let context = Arc::clone(&state.context);
    let worker_trace = trace_id.to_string();
    let handle = std::thread::Builder::new()
        .name(format!("operation-{}", &ticket.operation_id[..8]))
        .spawn(move || {
            let scope = OperationScope::new(
                context.as_ref(),
                events.as_ref(),
                notifier.as_ref(),
                guard.cancel_flag(),
                &worker_trace,
            );
            work(&scope);
            debug!(trace_id = %worker_trace, operation = %guard.kind(), "operation finished");
            drop(guard);
        })
        .map_err(|err| AppError::system(format!("Failed to start operation: {err}"), trace_id))?;

    info!(trace_id = %trace_id, operation = %ticket.operation, id = %ticket.operation_id, "operation started");
    Ok((ticket, handle))
}

fn start_install(
    state: &AppState,
    paths: Vec<PathBuf>,
    trace_id: &str,
    events: Arc<dyn EventSink>,
    notifier: Arc<dyn Notifier>,
) -> Result<(OperationTicket, JoinHandle<()>), AppError> {
    let apks = dropped_apks(&paths);
    if apks.is_empty() {
        return Err(AppError::validation("No APK files in selection", trace_id));
    }
    let kind = OperationKind::Install {
        apk_count: apks.len(),
    };
    start_operation(state, kind, trace_id, events, notifier, move |scope| {
        scope.install_dropped(&apks);
    })
}

fn cancel_running(state: &AppState, trace_id: &str) -> Result<OperationKind, AppError> {
    match state.operations.cancel_current() {
        Some(kind) => {
            info!(trace_id = %trace_id, operation = %kind, "cancellation requested");
            Ok(kind)
        }
        None => Err(AppError::validation("No operation is running", trace_id)),
    }
}

fn window_seams(app: &AppHandle) -> (Arc<dyn EventSink>, Arc<dyn Notifier>) {
    (
        Arc::new(TauriEvents::new(app.clone())),
        Arc::new(TauriDialogs::new(app.clone())),
    )
}

pub fn handle_dropped_paths(app: &AppHandle, paths: Vec<PathBuf>) {
    let trace_id = resolve_trace_id(None);
    if dropped_apks(&paths).is_empty() {
        debug!(trace_id = %trace_id, dropped = paths.len(), "ignoring drop without APK files");
        return;
    }
    let state = app.state::<AppState>();
    let (events, notifier) = window_seams(app);
    if let Err(err) = start_install(&state, paths, &trace_id, events, Arc::clone(&notifier)) {
        warn!(trace_id = %trace_id, error = %err, "could not start installation");
        std::thread::spawn(move || {
            notifier.notify(NoticeLevel::Warning, "Busy", &err.error);
        });
    }
}

#[tauri::command(async)]
pub fn get_config(
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<AppConfig>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    Ok(CommandResponse {
        trace_id,
        data: state.context.config.clone(),
    })
}

#[tauri::command(async)]
pub fn load_apps(
    app: AppHandle,
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<OperationTicket>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    info!(trace_id = %trace_id, "load_apps");
    let (events, notifier) = window_seams(&app);
    let (ticket, _) = start_operation(
        &state,
        OperationKind::LoadApps,
        &trace_id,
        events,
        notifier,
        |scope| {
            scope.refresh_app_list();
        },
    )?;
    Ok(CommandResponse {
        trace_id,
        data: ticket,
    })
}

#[tauri::command(async)]
pub fn uninstall_app(
    app: AppHandle,
    state: State<'_, AppState>,
    package_name: String,
    trace_id: Option<String>,
) -> Result<CommandResponse<OperationTicket>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    info!(trace_id = %trace_id, package_name = %package_name, "uninstall_app");
    ensure_non_empty(&package_name, "package_name", &trace_id)?;
    let package_name = package_name.trim().to_string();

    let (events, notifier) = window_seams(&app);
    let kind = OperationKind::Uninstall {
        package_name: package_name.clone(),
    };
    let (ticket, _) = start_operation(&state, kind, &trace_id, events, notifier, move |scope| {
        scope.uninstall_and_refresh(&package_name);
    })?;
    Ok(CommandResponse {
        trace_id,
        data: ticket,
    })
}

#[tauri::command(async)]
pub fn install_apks(
    app: AppHandle,
    state: State<'_, AppState>,
    paths: Vec<String>,
    trace_id: Option<String>,
) -> Result<CommandResponse<OperationTicket>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    info!(trace_id = %trace_id, count = paths.len(), "install_apks");
    let paths = paths.into_iter().map(PathBuf::from).collect();
    let (events, notifier) = window_seams(&app);
    let (ticket, _) = start_install(&state, paths, &trace_id, events, notifier)?;
    Ok(CommandResponse {
        trace_id,
        data: ticket,
    })
}

#[tauri::command(async)]
pub fn cancel_operation(
    state: State<'_, AppState>,
    trace_id: Option<String>,
) -> Result<CommandResponse<OperationKind>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let kind = cancel_running(&state, &trace_id)?;
    Ok(CommandResponse {
        trace_id,
        data: kind,
    })
}
