use tauri::{AppHandle, Emitter};
use tauri_plugin_dialog::{DialogExt, MessageDialogButtons, MessageDialogKind};
use tracing::warn;

use crate::app::models::{AppListEvent, NoticeLevel, APP_LIST_EVENT_NAME};
use crate::app::workflow::{EventSink, Notifier};

pub struct TauriEvents {
    app: AppHandle,
}

impl TauriEvents {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl EventSink for TauriEvents {
    fn emit(&self, event: AppListEvent) {
        if let Err(err) = self.app.emit(APP_LIST_EVENT_NAME, event) {
            warn!(error = %err, "failed to emit app list event");
        }
    }
}

pub struct TauriDialogs {
    app: AppHandle,
}

impl TauriDialogs {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

fn dialog_kind(level: NoticeLevel) -> MessageDialogKind {
    match level {
        NoticeLevel::Info => MessageDialogKind::Info,
        NoticeLevel::Warning => MessageDialogKind::Warning,
        NoticeLevel::Error => MessageDialogKind::Error,
    }
}

impl Notifier for TauriDialogs {
    fn notify(&self, level: NoticeLevel, title: &str, message: &str) {
        self.app
            .dialog()
            .message(message)
            .title(title)
            .kind(dialog_kind(level))
            .blocking_show();
    }

    fn confirm(&self, title: &str, message: &str) -> bool {
        self.app
            .dialog()
            .message(message)
            .title(title)
            .kind(MessageDialogKind::Info)
            .buttons(MessageDialogButtons::YesNo)
            .blocking_show()
    }
}
