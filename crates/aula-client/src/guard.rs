//! Shared UI state handle and the scoped in-flight guard.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use aula_core::{ControlId, PendingAction, UiState};

/// Page-session state shared by the action client and the subscriber.
/// The lock is never held across an `.await`.
pub type SharedUi = Arc<Mutex<UiState>>;

pub fn shared_ui(state: UiState) -> SharedUi {
    Arc::new(Mutex::new(state))
}

pub fn lock_ui(ui: &SharedUi) -> MutexGuard<'_, UiState> {
    ui.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds a control in flight with the overlay shown. Dropping the guard on
/// any exit path (return, `?`, panic, cancelled future) re-enables the
/// control and hides the overlay.
#[must_use = "dropping the guard immediately releases the control"]
pub struct InFlightGuard {
    ui: SharedUi,
    control: ControlId,
    success: bool,
    released: bool,
}

impl InFlightGuard {
    /// `None` if the control already has an action in flight.
    pub fn try_acquire(ui: &SharedUi, control: ControlId, action: PendingAction) -> Option<Self> {
        if !lock_ui(ui).try_begin(&control, action) {
            return None;
        }
        Some(Self {
            ui: Arc::clone(ui),
            control,
            success: false,
            released: false,
        })
    }

    pub fn control(&self) -> &ControlId {
        &self.control
    }

    pub fn mark_success(&mut self) {
        self.success = true;
    }

    /// Release now and return the settled action.
    pub fn release(mut self) -> Option<PendingAction> {
        self.finish()
    }

    fn finish(&mut self) -> Option<PendingAction> {
        if self.released {
            return None;
        }
        self.released = true;
        lock_ui(&self.ui).finish(&self.control, self.success)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if !self.released {
            tracing::debug!(control = %self.control, "in-flight guard dropped without release");
        }
        self.finish();
    }
}
