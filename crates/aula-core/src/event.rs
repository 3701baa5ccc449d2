//! Inbound stream frames.
//!
//! The notification socket carries JSON text frames with a `type`
//! discriminator. Two shapes deliver the same unread notification:
//!
//! ```text
//! {"type":"notify.unread","event":"citacion","unread":1,"mensaje":"...","citacion_id":7,"estudiante":"...","cuando":"..."}
//! {"type":"notif","data":{ ...same fields... }}
//! ```
//!
//! `director_inbox` (alias `director.citacion`) frames carry citation
//! proposals for the director's inbox.
//! Every other tag is reported as `Unrecognized`.

use serde::Deserialize;
use serde_json::Value;

use crate::error::CoreError;

pub const TAG_NOTIFY_UNREAD: &str = "notify.unread";
pub const TAG_NOTIF: &str = "notif";
pub const TAG_DIRECTOR_INBOX: &str = "director_inbox";
/// Same payload as `director_inbox`, sent by the citation workflow.
pub const TAG_DIRECTOR_CITACION: &str = "director.citacion";

#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    Notification(NotificationEvent),
    Inbox(InboxEntry),
    Unrecognized(String),
}

impl StreamFrame {
    pub fn parse(text: &str) -> Result<Self, CoreError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| CoreError::MalformedFrame(e.to_string()))?;
        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(CoreError::MissingFrameType)?;

        match tag {
            TAG_NOTIFY_UNREAD => NotificationEvent::from_value(tag, &value).map(Self::Notification),
            TAG_NOTIF => {
                let data = frame_data(&value)?;
                let inner = data.get("type").and_then(Value::as_str).unwrap_or(tag);
                NotificationEvent::from_value(inner, data).map(Self::Notification)
            }
            TAG_DIRECTOR_INBOX | TAG_DIRECTOR_CITACION => {
                InboxEntry::from_value(frame_data(&value)?).map(Self::Inbox)
            }
            other => Ok(Self::Unrecognized(other.to_string())),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Self::Notification(ev) => &ev.tag,
            Self::Inbox(_) => TAG_DIRECTOR_INBOX,
            Self::Unrecognized(tag) => tag,
        }
    }
}

fn frame_data(value: &Value) -> Result<&Value, CoreError> {
    value
        .get("data")
        .filter(|d| d.is_object())
        .ok_or_else(|| CoreError::MalformedFrame("missing `data` object".into()))
}

/// Ids arrive as numbers or strings depending on the producer.
fn id_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

// ─── Notification ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawNotification {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    unread: Option<Value>,
    #[serde(default)]
    mensaje: Option<String>,
    #[serde(default)]
    citacion_id: Option<Value>,
    #[serde(default)]
    estudiante: Option<String>,
    #[serde(default)]
    cuando: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub tag: String,
    pub event_kind: Option<String>,
    pub subject_id: Option<String>,
    pub student: Option<String>,
    pub text: String,
    pub timestamp: String,
    pub unread_delta: u64,
}

impl NotificationEvent {
    fn from_value(tag: &str, value: &Value) -> Result<Self, CoreError> {
        let raw = RawNotification::deserialize(value)
            .map_err(|e| CoreError::MalformedFrame(e.to_string()))?;

        // Absent, zero, negative or non-numeric deltas count as one.
        let unread_delta = raw
            .unread
            .as_ref()
            .and_then(Value::as_i64)
            .filter(|n| *n > 0)
            .map(|n| n as u64)
            .unwrap_or(1);

        Ok(Self {
            tag: tag.to_string(),
            event_kind: non_empty(raw.event),
            subject_id: id_string(raw.citacion_id.as_ref()),
            student: non_empty(raw.estudiante),
            text: raw.mensaje.unwrap_or_default(),
            timestamp: raw.cuando.unwrap_or_default(),
            unread_delta,
        })
    }

    pub fn is_citation(&self) -> bool {
        self.event_kind.as_deref() == Some("citacion")
    }
}

// ─── Director inbox ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawInbox {
    #[serde(default)]
    citacion_id: Option<Value>,
    #[serde(default)]
    estudiante: Option<String>,
    #[serde(default)]
    motivo: Option<String>,
    #[serde(default)]
    razon: Option<String>,
    #[serde(default)]
    sugerido: Option<String>,
    #[serde(default)]
    rho: Option<f64>,
    #[serde(default, rename = "Wq")]
    wq: Option<f64>,
}

/// Citation proposal pushed to the director's inbox.
#[derive(Debug, Clone, PartialEq)]
pub struct InboxEntry {
    pub citation_id: Option<String>,
    pub student: Option<String>,
    pub reason: String,
    pub suggested: Option<String>,
    pub utilization: Option<f64>,
    pub expected_wait: Option<f64>,
}

impl InboxEntry {
    fn from_value(value: &Value) -> Result<Self, CoreError> {
        let raw =
            RawInbox::deserialize(value).map_err(|e| CoreError::MalformedFrame(e.to_string()))?;
        let reason = non_empty(raw.motivo)
            .or_else(|| non_empty(raw.razon))
            .unwrap_or_default();
        Ok(Self {
            citation_id: id_string(raw.citacion_id.as_ref()),
            student: non_empty(raw.estudiante),
            reason,
            suggested: non_empty(raw.sugerido),
            utilization: raw.rho,
            expected_wait: raw.wq,
        })
    }
}
