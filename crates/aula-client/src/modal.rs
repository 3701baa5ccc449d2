//! Single-instance confirm/alert modal.
//!
//! `ModalHost` owns one slot. Opening a modal while another is pending
//! resolves the previous request with `ModalAnswer::Dismissed` and replaces
//! it: last caller wins, nothing is queued, no caller is left waiting forever.
//! A presenter (terminal prompt, auto-responder, test harness) watches the
//! current request and answers it with `respond`.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

pub const CONFIRM_TITLE: &str = "Confirmar acción";
pub const ALERT_TITLE: &str = "Información";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalKind {
    Confirm,
    Alert,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalRequest {
    pub id: u64,
    pub kind: ModalKind,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalAnswer {
    Accepted,
    Declined,
    /// Replaced by a newer request or closed without an answer.
    Dismissed,
}

#[derive(Default)]
struct Slot {
    next_id: u64,
    pending: Option<(u64, oneshot::Sender<ModalAnswer>)>,
}

pub struct ModalHost {
    slot: Mutex<Slot>,
    current: watch::Sender<Option<ModalRequest>>,
}

impl Default for ModalHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ModalHost {
    pub fn new() -> Self {
        let (current, _rx) = watch::channel(None);
        Self {
            slot: Mutex::new(Slot::default()),
            current,
        }
    }

    /// Observe the request currently on screen (`None` when closed).
    pub fn subscribe(&self) -> watch::Receiver<Option<ModalRequest>> {
        self.current.subscribe()
    }

    pub fn current(&self) -> Option<ModalRequest> {
        self.current.borrow().clone()
    }

    pub fn is_open(&self) -> bool {
        self.current.borrow().is_some()
    }

    fn open(&self, kind: ModalKind, title: &str, message: &str) -> oneshot::Receiver<ModalAnswer> {
        let (tx, rx) = oneshot::channel();
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.next_id += 1;
        let id = slot.next_id;
        if let Some((prev_id, prev_tx)) = slot.pending.replace((id, tx)) {
            tracing::debug!(prev_id, id, "modal: replacing pending request");
            let _ = prev_tx.send(ModalAnswer::Dismissed);
        }
        self.current.send_replace(Some(ModalRequest {
            id,
            kind,
            title: title.to_string(),
            message: message.to_string(),
        }));
        rx
    }

    /// Yes/no question. Anything but an explicit accept is `false`.
    pub async fn confirm(&self, message: &str) -> bool {
        let rx = self.open(ModalKind::Confirm, CONFIRM_TITLE, message);
        matches!(rx.await, Ok(ModalAnswer::Accepted))
    }

    /// Acknowledge-only message.
    pub async fn alert(&self, message: &str, title: Option<&str>) -> ModalAnswer {
        let rx = self.open(ModalKind::Alert, title.unwrap_or(ALERT_TITLE), message);
        rx.await.unwrap_or(ModalAnswer::Dismissed)
    }

    /// Answer request `id`. Stale ids (already replaced or answered) are ignored.
    pub fn respond(&self, id: u64, answer: ModalAnswer) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.pending.take() {
            Some((pending_id, tx)) if pending_id == id => {
                let _ = tx.send(answer);
                self.current.send_replace(None);
                true
            }
            other => {
                slot.pending = other;
                false
            }
        }
    }

    /// Close whatever is open, resolving it as `Dismissed` (navigation).
    pub fn dismiss(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((_, tx)) = slot.pending.take() {
            let _ = tx.send(ModalAnswer::Dismissed);
        }
        self.current.send_replace(None);
    }
}

/// Answer every modal automatically: alerts are acknowledged, confirms get
/// `confirm_answer`. Each request seen is forwarded on the returned channel.
/// The task ends when the host is dropped.
pub fn spawn_auto_responder(
    host: &Arc<ModalHost>,
    confirm_answer: ModalAnswer,
) -> (JoinHandle<()>, mpsc::UnboundedReceiver<ModalRequest>) {
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();
    let mut current = host.subscribe();
    let weak = Arc::downgrade(host);
    let handle = tokio::spawn(async move {
        while current.changed().await.is_ok() {
            let Some(request) = current.borrow_and_update().clone() else {
                continue;
            };
            let Some(host) = weak.upgrade() else {
                break;
            };
            let answer = match request.kind {
                ModalKind::Confirm => confirm_answer,
                ModalKind::Alert => ModalAnswer::Accepted,
            };
            let _ = seen_tx.send(request.clone());
            host.respond(request.id, answer);
        }
    });
    (handle, seen_rx)
}
