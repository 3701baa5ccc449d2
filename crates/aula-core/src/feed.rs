//! Unread counter and the most-recent-first notification feed.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::event::NotificationEvent;

// ─── Unread counter ───────────────────────────────────────────────

/// Mutated only by notification arrival and by "mark all read".
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UnreadCounter(u64);

impl UnreadCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, delta: u64) -> u64 {
        self.0 = self.0.saturating_add(delta);
        self.0
    }

    pub fn reset(&mut self) {
        self.0 = 0;
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    /// Badge text, `None` when the badge is hidden.
    pub fn badge(&self) -> Option<String> {
        (self.0 > 0).then(|| self.0.to_string())
    }
}

// ─── Feed ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub body: String,
    pub timestamp: String,
    pub received_at: DateTime<Utc>,
}

impl FeedEntry {
    pub fn from_event(event: &NotificationEvent, received_at: DateTime<Utc>) -> Self {
        let title = match (&event.subject_id, event.is_citation()) {
            (Some(id), true) => format!("Citación #{id}"),
            (None, true) => "Citación".to_string(),
            _ => "Notificación".to_string(),
        };
        let body = match &event.student {
            Some(student) => format!("{student} — {}", event.text),
            None => event.text.clone(),
        };
        Self {
            title,
            body,
            timestamp: event.timestamp.clone(),
            received_at,
        }
    }
}

impl fmt::Display for FeedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.body)?;
        if !self.timestamp.is_empty() {
            write!(f, " ({})", self.timestamp)?;
        }
        Ok(())
    }
}

/// Display log, newest first. Unbounded unless a cap is set.
#[derive(Debug, Clone, Default)]
pub struct NotificationFeed {
    entries: VecDeque<FeedEntry>,
    cap: Option<usize>,
}

impl NotificationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cap(cap: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cap: Some(cap.max(1)),
        }
    }

    pub fn set_cap(&mut self, cap: Option<usize>) {
        self.cap = cap.map(|c| c.max(1));
        self.enforce_cap();
    }

    pub fn cap(&self) -> Option<usize> {
        self.cap
    }

    pub fn prepend(&mut self, entry: FeedEntry) {
        self.entries.push_front(entry);
        self.enforce_cap();
    }

    fn enforce_cap(&mut self) {
        if let Some(cap) = self.cap {
            self.entries.truncate(cap);
        }
    }

    pub fn first(&self) -> Option<&FeedEntry> {
        self.entries.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeedEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: Option<&str>, kind: Option<&str>, student: Option<&str>, text: &str) -> NotificationEvent {
        NotificationEvent {
            tag: "notify.unread".into(),
            event_kind: kind.map(Into::into),
            subject_id: id.map(Into::into),
            student: student.map(Into::into),
            text: text.into(),
            timestamp: "2026-03-01T10:00:00".into(),
            unread_delta: 1,
        }
    }

    #[test]
    fn counter_badge_hidden_at_zero() {
        let mut c = UnreadCounter::new();
        assert_eq!(c.badge(), None);
        c.increment(2);
        assert_eq!(c.badge().as_deref(), Some("2"));
        c.reset();
        assert_eq!(c.get(), 0);
        assert_eq!(c.badge(), None);
    }

    #[test]
    fn counter_saturates() {
        let mut c = UnreadCounter::new();
        c.increment(u64::MAX);
        assert_eq!(c.increment(5), u64::MAX);
    }

    #[test]
    fn citation_entry_format() {
        let e = FeedEntry::from_event(
            &event(Some("7"), Some("citacion"), Some("Ana"), "Reunión"),
            Utc::now(),
        );
        assert_eq!(e.title, "Citación #7");
        assert_eq!(e.body, "Ana — Reunión");
        assert!(e.to_string().contains("2026-03-01T10:00:00"));
    }

    #[test]
    fn generic_entry_format() {
        let e = FeedEntry::from_event(&event(Some("7"), None, None, "Hola"), Utc::now());
        assert_eq!(e.title, "Notificación");
        assert_eq!(e.body, "Hola");
    }

    #[test]
    fn feed_is_newest_first() {
        let mut feed = NotificationFeed::new();
        let now = Utc::now();
        feed.prepend(FeedEntry::from_event(&event(None, None, None, "a"), now));
        feed.prepend(FeedEntry::from_event(&event(None, None, None, "b"), now));
        let bodies: Vec<_> = feed.iter().map(|e| e.body.as_str()).collect();
        assert_eq!(bodies, ["b", "a"]);
    }

    #[test]
    fn feed_cap_drops_oldest() {
        let mut feed = NotificationFeed::with_cap(2);
        let now = Utc::now();
        for text in ["a", "b", "c"] {
            feed.prepend(FeedEntry::from_event(&event(None, None, None, text), now));
        }
        let bodies: Vec<_> = feed.iter().map(|e| e.body.as_str()).collect();
        assert_eq!(bodies, ["c", "b"]);

        feed.set_cap(Some(1));
        assert_eq!(feed.len(), 1);
        assert_eq!(feed.first().map(|e| e.body.as_str()), Some("c"));
    }
}
