//! Busy overlay: one process-wide boolean lock shown while a request is pending.
//!
//! No nesting or reference counting. A second `acquire` while shown is a
//! no-op and a single `release` hides it, so concurrent actions on different
//! controls share the flag and the first to settle clears it.

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BusyOverlay {
    shown: bool,
}

impl BusyOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if this call made the overlay visible.
    pub fn acquire(&mut self) -> bool {
        let changed = !self.shown;
        self.shown = true;
        changed
    }

    /// Returns `true` if this call hid the overlay.
    pub fn release(&mut self) -> bool {
        let changed = self.shown;
        self.shown = false;
        changed
    }

    pub fn is_shown(&self) -> bool {
        self.shown
    }
}
