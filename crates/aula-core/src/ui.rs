//! `UiState`: the explicit page-session context that owns the overlay, the
//! unread counter, the notification feed, the displayed row list and the
//! set of in-flight controls.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};

use crate::event::{InboxEntry, StreamFrame};
use crate::feed::{FeedEntry, NotificationFeed, UnreadCounter};
use crate::overlay::BusyOverlay;
use crate::types::{ActionStatus, ControlId, PendingAction, TargetId};

/// Rows currently displayed for a list view, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowList {
    rows: Vec<TargetId>,
}

impl RowList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, target: TargetId) {
        if !self.rows.contains(&target) {
            self.rows.push(target);
        }
    }

    /// Returns `true` if the row was present.
    pub fn remove(&mut self, target: &TargetId) -> bool {
        let before = self.rows.len();
        self.rows.retain(|r| r != target);
        self.rows.len() != before
    }

    pub fn contains(&self, target: &TargetId) -> bool {
        self.rows.contains(target)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TargetId> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromIterator<TargetId> for RowList {
    fn from_iter<I: IntoIterator<Item = TargetId>>(iter: I) -> Self {
        let mut list = Self::new();
        for t in iter {
            list.push(t);
        }
        list
    }
}

/// What applying a stream frame did to the state. Carries the entry that
/// was added so subscribers never have to read it back from the feed.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameEffect {
    Counted {
        delta: u64,
        unread: u64,
        entry: FeedEntry,
    },
    Inbox(InboxEntry),
    Ignored(String),
}

#[derive(Debug, Default)]
pub struct UiState {
    pub overlay: BusyOverlay,
    pub counter: UnreadCounter,
    pub feed: NotificationFeed,
    pub inbox: VecDeque<InboxEntry>,
    pub rows: RowList,
    in_flight: HashMap<ControlId, PendingAction>,
    reload_requested: bool,
}

impl UiState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: impl IntoIterator<Item = TargetId>) -> Self {
        Self {
            rows: rows.into_iter().collect(),
            ..Self::default()
        }
    }

    // ─── Single-flight ────────────────────────────────────────────

    /// Marks `control` in flight and shows the overlay. Returns `false`
    /// (and changes nothing) if the control already has an action in flight.
    pub fn try_begin(&mut self, control: &ControlId, mut action: PendingAction) -> bool {
        if self.in_flight.contains_key(control) {
            return false;
        }
        action.begin();
        self.in_flight.insert(control.clone(), action);
        self.overlay.acquire();
        true
    }

    /// Clears `control` and hides the overlay. Returns the settled action.
    pub fn finish(&mut self, control: &ControlId, success: bool) -> Option<PendingAction> {
        self.overlay.release();
        let mut action = self.in_flight.remove(control)?;
        action.settle(success);
        Some(action)
    }

    pub fn is_in_flight(&self, control: &ControlId) -> bool {
        self.in_flight
            .get(control)
            .is_some_and(|a| a.status == ActionStatus::InFlight)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    // ─── Reload ───────────────────────────────────────────────────

    pub fn request_reload(&mut self) {
        self.reload_requested = true;
    }

    pub fn reload_requested(&self) -> bool {
        self.reload_requested
    }

    /// Returns and clears the reload flag.
    pub fn take_reload(&mut self) -> bool {
        std::mem::take(&mut self.reload_requested)
    }

    // ─── Notifications ────────────────────────────────────────────

    pub fn apply_frame(&mut self, frame: StreamFrame, received_at: DateTime<Utc>) -> FrameEffect {
        match frame {
            StreamFrame::Notification(event) => {
                let unread = self.counter.increment(event.unread_delta);
                let entry = FeedEntry::from_event(&event, received_at);
                self.feed.prepend(entry.clone());
                FrameEffect::Counted {
                    delta: event.unread_delta,
                    unread,
                    entry,
                }
            }
            StreamFrame::Inbox(entry) => {
                self.inbox.push_front(entry.clone());
                FrameEffect::Inbox(entry)
            }
            StreamFrame::Unrecognized(tag) => FrameEffect::Ignored(tag),
        }
    }

    pub fn mark_all_read(&mut self) {
        self.counter.reset();
    }

    /// Back to a fresh page session (navigation).
    pub fn reset(&mut self) {
        let cap = self.feed.cap();
        *self = Self::default();
        self.feed.set_cap(cap);
    }
}
