use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::app::context::AppContext;
use crate::app::error::AppError;
use crate::app::models::OperationKind;

struct RunningOperation {
    id: String,
    kind: OperationKind,
    cancel_flag: Arc<AtomicBool>,
}

/// Holds at most one running operation at a time.
#[derive(Default)]
pub struct OperationSlot {
    current: Mutex<Option<RunningOperation>>,
}

impl OperationSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(
        self: &Arc<Self>,
        kind: OperationKind,
        trace_id: &str,
    ) -> Result<OperationGuard, AppError> {
        let mut guard = self
            .current
            .lock()
            .map_err(|_| AppError::system("Operation registry locked", trace_id))?;
        if let Some(running) = guard.as_ref() {
            return Err(AppError::busy(&running.kind, trace_id));
        }
        let id = Uuid::new_v4().to_string();
        let cancel_flag = Arc::new(AtomicBool::new(false));
        *guard = Some(RunningOperation {
            id: id.clone(),
            kind: kind.clone(),
            cancel_flag: Arc::clone(&cancel_flag),
        });
        Ok(OperationGuard {
            slot: Arc::clone(self),
            id,
            kind,
            cancel_flag,
        })
    }

    pub fn cancel_current(&self) -> Option<OperationKind> {
        let guard = self.current.lock().ok()?;
        let running = guard.as_ref()?;
        running.cancel_flag.store(true, Ordering::Relaxed);
        Some(running.kind.clone())
    }

    pub fn current(&self) -> Option<OperationKind> {
        let guard = self.current.lock().ok()?;
        guard.as_ref().map(|running| running.kind.clone())
    }

    fn release(&self, id: &str) {
        if let Ok(mut guard) = self.current.lock() {
            if guard.as_ref().map(|running| running.id == id).unwrap_or(false) {
                *guard = None;
            }
        }
    }
}

pub struct OperationGuard {
    slot: Arc<OperationSlot>,
    id: String,
    kind: OperationKind,
    cancel_flag: Arc<AtomicBool>,
}

impl OperationGuard {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &OperationKind {
        &self.kind
    }

    pub fn cancel_flag(&self) -> &AtomicBool {
        &self.cancel_flag
    }
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        self.slot.release(&self.id);
    }
}

pub struct AppState {
    pub context: Arc<AppContext>,
    pub operations: Arc<OperationSlot>,
}

impl AppState {
    pub fn new(context: AppContext) -> Self {
        Self {
            context: Arc::new(context),
            operations: Arc::new(OperationSlot::new()),
        }
    }
}
