use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::app::adb::apk::{inspect_apk, is_apk_path};
use crate::app::adb::parse::parse_package_list;
use crate::app::catalog::CatalogLookup;
use crate::app::context::AppContext;
use crate::app::icons::{normalize_icon, placeholder_png};
use crate::app::models::{
    ApkInstallErrorCode, AppListEvent, AppRecord, AppRow, IconSource, LoadOutcome,
    MetadataStatus, NoticeLevel, OperationKind, DEFAULT_DISPLAY_NAME,
};

pub const LOAD_FAILED_MESSAGE: &str =
    "Failed to load apps. Make sure ADB is running and the device is connected.";
pub const NO_APPS_MESSAGE: &str = "No apps found or failed to retrieve the app list.";
pub const NO_DEVICE_MESSAGE: &str =
    "No device connected. Please ensure your device is connected and ADB is enabled.";

pub trait EventSink: Send + Sync {
    fn emit(&self, event: AppListEvent);
}

pub trait Notifier: Send + Sync {
    fn notify(&self, level: NoticeLevel, title: &str, message: &str);

    fn confirm(&self, title: &str, message: &str) -> bool;
}

pub struct OperationScope<'a> {
    ctx: &'a AppContext,
    events: &'a dyn EventSink,
    notifier: &'a dyn Notifier,
    cancel: &'a AtomicBool,
    trace_id: &'a str,
}

impl<'a> OperationScope<'a> {
    pub fn new(
        ctx: &'a AppContext,
        events: &'a dyn EventSink,
        notifier: &'a dyn Notifier,
        cancel: &'a AtomicBool,
        trace_id: &'a str,
    ) -> Self {
        Self {
            ctx,
            events,
            notifier,
            cancel,
            trace_id,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    fn started(&self, operation: OperationKind) {
        self.events.emit(AppListEvent::Started {
            trace_id: self.trace_id.to_string(),
            operation,
        });
    }

    fn finish(&self, outcome: LoadOutcome) -> LoadOutcome {
        self.events.emit(AppListEvent::Finished {
            trace_id: self.trace_id.to_string(),
            outcome: outcome.clone(),
            finished_at: Utc::now().to_rfc3339(),
        });
        outcome
    }

    fn surface(&self, level: NoticeLevel, title: &str, message: &str) {
        self.events.emit(AppListEvent::Notice {
            trace_id: self.trace_id.to_string(),
            level,
            title: title.to_string(),
            message: message.to_string(),
        });
        self.notifier.notify(level, title, message);
    }

    fn fail(&self, message: &str) -> LoadOutcome {
        self.surface(NoticeLevel::Error, "Error", message);
        self.finish(LoadOutcome::Failed {
            message: message.to_string(),
        })
    }

    pub fn refresh_app_list(&self) -> LoadOutcome {
        let trace_id = self.trace_id;
        info!(trace_id = %trace_id, "loading apps");
        self.started(OperationKind::LoadApps);

        // Lenient mode accepts the bare `List of devices attached` header.
        let strict = self.ctx.config.device.require_connected_device;
        match self.ctx.adb.check_device(self.cancel, trace_id) {
            Err(err) if err.is_cancelled() => return self.finish(LoadOutcome::Cancelled),
            Ok(check) if (strict && check.ready) || (!strict && check.reachable) => {}
            outcome => {
                if let Err(err) = outcome {
                    warn!(trace_id = %trace_id, error = %err, "device check failed");
                }
                if strict {
                    return self.fail(NO_DEVICE_MESSAGE);
                }
                self.surface(NoticeLevel::Error, "Error", NO_DEVICE_MESSAGE);
            }
        }

        info!(trace_id = %trace_id, "fetching list of installed packages");
        let output = match self.ctx.adb.list_third_party_packages(self.cancel, trace_id) {
            Ok(output) => output,
            Err(err) if err.is_cancelled() => return self.finish(LoadOutcome::Cancelled),
            Err(err) => {
                error!(trace_id = %trace_id, error = %err, "error while loading apps");
                return self.fail(LOAD_FAILED_MESSAGE);
            }
        };
        if !output.stderr.is_empty() {
            error!(trace_id = %trace_id, stderr = %output.stderr_text(), "error while loading apps");
            return self.fail(LOAD_FAILED_MESSAGE);
        }

        let packages = parse_package_list(&output.stdout_text());
        if packages.is_empty() {
            warn!(trace_id = %trace_id, "no apps found");
            self.surface(NoticeLevel::Warning, "Warning", NO_APPS_MESSAGE);
            return self.finish(LoadOutcome::Empty);
        }

        let total = packages.len();
        for (index, package_name) in packages.iter().enumerate() {
            if self.is_cancelled() {
                info!(trace_id = %trace_id, loaded = index, total, "app loading cancelled");
                return self.finish(LoadOutcome::Cancelled);
            }
            let record = self.build_app_record(package_name);
            debug!(trace_id = %trace_id, package_name = %package_name, "app added to list");
            self.events.emit(AppListEvent::Row {
                trace_id: trace_id.to_string(),
                row: AppRow::from(&record),
            });
            self.events.emit(AppListEvent::Progress {
                trace_id: trace_id.to_string(),
                done: index + 1,
                total,
                package_name: package_name.clone(),
            });
        }

        info!(trace_id = %trace_id, count = total, "finished loading apps");
        self.finish(LoadOutcome::Completed { count: total })
    }

    pub fn build_app_record(&self, package_name: &str) -> AppRecord {
        let icons = &self.ctx.config.icons;
        let placeholder = placeholder_png(
            &self.ctx.placeholder_path,
            icons.size_px,
            &icons.preferred_fonts,
            self.trace_id,
        );

        let entry = match self.ctx.catalog.lookup(package_name, self.trace_id) {
            CatalogLookup::Found(entry) => entry,
            CatalogLookup::Degraded { reason } => {
                debug!(trace_id = %self.trace_id, package_name = %package_name, reason = %reason, "using default metadata");
                return AppRecord {
                    package_name: package_name.to_string(),
                    display_name: DEFAULT_DISPLAY_NAME.to_string(),
                    icon_png: placeholder,
                    icon_source: IconSource::Placeholder,
                    metadata: MetadataStatus::Degraded,
                };
            }
        };

        let icon = entry.icon_url.as_deref().and_then(|url| {
            let fetched = self
                .ctx
                .catalog
                .fetch_icon(url, self.trace_id)
                .map_err(|err| err.error)
                .and_then(|bytes| normalize_icon(&bytes, icons.size_px));
            match fetched {
                Ok(bytes) => Some(bytes),
                Err(err) => {
                    warn!(trace_id = %self.trace_id, package_name = %package_name, error = %err, "failed to fetch icon");
                    None
                }
            }
        });

        let (icon_png, icon_source) = match icon {
            Some(bytes) => (bytes, IconSource::Catalog),
            None => (placeholder, IconSource::Placeholder),
        };
        AppRecord {
            package_name: package_name.to_string(),
            display_name: entry.title,
            icon_png,
            icon_source,
            metadata: MetadataStatus::Found,
        }
    }

    pub fn uninstall_and_refresh(&self, package_name: &str) -> LoadOutcome {
        let trace_id = self.trace_id;
        info!(trace_id = %trace_id, package_name = %package_name, "uninstalling app");
        self.started(OperationKind::Uninstall {
            package_name: package_name.to_string(),
        });

        match self.ctx.adb.uninstall(package_name, self.cancel, trace_id) {
            Ok(output) if output.succeeded() => {
                info!(trace_id = %trace_id, package_name = %package_name, "app uninstalled");
            }
            Ok(output) => {
                let detail = first_non_empty(&output.stderr_text(), &output.stdout_text());
                error!(trace_id = %trace_id, package_name = %package_name, error = %detail, "failed to uninstall app");
                self.surface(
                    NoticeLevel::Error,
                    "Error",
                    &with_detail(&format!("Failed to uninstall {package_name}."), &detail),
                );
            }
            Err(err) if err.is_cancelled() => return self.finish(LoadOutcome::Cancelled),
            Err(err) => {
                error!(trace_id = %trace_id, package_name = %package_name, error = %err, "failed to uninstall app");
                self.surface(
                    NoticeLevel::Error,
                    "Error",
                    &with_detail(&format!("Failed to uninstall {package_name}."), &err.error),
                );
            }
        }

        self.refresh_app_list()
    }

    /// Returns `None` when nothing was installed and the list was left alone.
    pub fn install_dropped(&self, paths: &[PathBuf]) -> Option<LoadOutcome> {
        let trace_id = self.trace_id;
        let apks: Vec<&PathBuf> = paths.iter().filter(|path| is_apk_path(path)).collect();
        if apks.is_empty() {
            debug!(trace_id = %trace_id, dropped = paths.len(), "no APK in dropped files");
            return None;
        }

        let mut attempted = false;
        for path in &apks {
            if self.is_cancelled() {
                break;
            }
            let apk = match inspect_apk(path) {
                Ok(apk) => apk,
                Err(message) => {
                    warn!(trace_id = %trace_id, path = %path.display(), error = %message, "rejected dropped file");
                    self.surface(NoticeLevel::Error, "Error", &message);
                    continue;
                }
            };
            info!(trace_id = %trace_id, path = %apk.path.display(), "APK dropped for installation");
            let question = format!("Do you want to install {}?", apk.file_name);
            if !self.notifier.confirm("Install APK", &question) {
                info!(trace_id = %trace_id, file = %apk.file_name, "installation declined");
                continue;
            }
            if !attempted {
                attempted = true;
                self.started(OperationKind::Install {
                    apk_count: apks.len(),
                });
            }

            match self.ctx.adb.install(&apk.path, self.cancel, trace_id) {
                Ok(output) if output.succeeded() => {
                    info!(trace_id = %trace_id, file = %apk.file_name, "APK installed");
                    self.surface(
                        NoticeLevel::Info,
                        "Success",
                        &format!("{} installed successfully.", apk.file_name),
                    );
                }
                Ok(output) => {
                    let raw = format!("{}\n{}", output.stdout_text(), output.stderr_text());
                    let code = ApkInstallErrorCode::from_output(&raw);
                    error!(trace_id = %trace_id, file = %apk.file_name, code = code.code(), error = %raw.trim(), "failed to install APK");
                    let message = format!("Failed to install {}.", apk.file_name);
                    let message = match code {
                        ApkInstallErrorCode::UnknownError | ApkInstallErrorCode::Success => message,
                        code => with_detail(&message, code.description()),
                    };
                    self.surface(NoticeLevel::Error, "Error", &message);
                }
                Err(err) if err.is_cancelled() => return Some(self.finish(LoadOutcome::Cancelled)),
                Err(err) => {
                    error!(trace_id = %trace_id, file = %apk.file_name, error = %err, "failed to install APK");
                    self.surface(
                        NoticeLevel::Error,
                        "Error",
                        &with_detail(&format!("Failed to install {}.", apk.file_name), &err.error),
                    );
                }
            }
        }

        if attempted {
            Some(self.refresh_app_list())
        } else {
            None
        }
    }
}

fn first_non_empty(primary: &str, secondary: &str) -> String {
    let primary = primary.trim();
    if primary.is_empty() {
        secondary.trim().to_string()
    } else {
        primary.to_string()
    }
}

fn with_detail(message: &str, detail: &str) -> String {
    if detail.trim().is_empty() {
        message.to_string()
    } else {
        format!("{message}\n\n{}", detail.trim())
    }
}

pub fn dropped_apks(paths: &[PathBuf]) -> Vec<PathBuf> {
    paths.iter().filter(|path| is_apk_path(path)).cloned().collect()
}
