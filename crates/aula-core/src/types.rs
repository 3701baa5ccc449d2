use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

// ─── Identity ─────────────────────────────────────────────────────

/// Opaque identifier of the record an action targets (a citation id, a row id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(String);

impl TargetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<u64> for TargetId {
    fn from(n: u64) -> Self {
        Self::new(n.to_string())
    }
}

/// Logical control that triggers an action. Single-flight is enforced per control.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlId(String);

impl ControlId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Default control for a (kind, target) pair, e.g. `approve:42`.
    pub fn for_action(kind: &ActionKind, target: &TargetId) -> Self {
        Self(format!("{kind}:{target}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── Action Kind & Status ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Approve,
    Reject,
    Notify,
    Custom(String),
}

impl ActionKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Notify => "notify",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" => Err(CoreError::UnknownActionKind(s.to_string())),
            "approve" | "aprobar" => Ok(Self::Approve),
            "reject" | "rechazar" => Ok(Self::Reject),
            "notify" | "notificar" => Ok(Self::Notify),
            _ => Ok(Self::Custom(trimmed.to_string())),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    #[default]
    Idle,
    InFlight,
    Done,
    Failed,
}

impl ActionStatus {
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// One user-initiated state change, alive from click to response handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    pub target: TargetId,
    pub kind: ActionKind,
    pub status: ActionStatus,
}

impl PendingAction {
    pub fn new(target: TargetId, kind: ActionKind) -> Self {
        Self {
            target,
            kind,
            status: ActionStatus::Idle,
        }
    }

    /// Idle -> InFlight. Any other starting state is left untouched.
    pub fn begin(&mut self) -> bool {
        if self.status != ActionStatus::Idle {
            return false;
        }
        self.status = ActionStatus::InFlight;
        true
    }

    /// InFlight -> Done | Failed.
    pub fn settle(&mut self, success: bool) {
        if self.status == ActionStatus::InFlight {
            self.status = if success {
                ActionStatus::Done
            } else {
                ActionStatus::Failed
            };
        }
    }
}

// ─── Response Envelope ────────────────────────────────────────────

/// `{ok, error?, message?, ...}` returned by every action endpoint.
/// Fields other than the three known ones are kept in `payload`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl ResponseEnvelope {
    pub fn from_slice(body: &[u8]) -> Result<Self, CoreError> {
        serde_json::from_slice(body).map_err(|e| CoreError::MalformedFrame(e.to_string()))
    }

    /// First non-empty of `error`, `message`.
    pub fn display_message(&self) -> Option<&str> {
        [self.error.as_deref(), self.message.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|m| !m.is_empty())
    }

    /// Message to show for `ok == false`, falling back to a generic one.
    pub fn rejection_message(&self, status: u16) -> String {
        match self.display_message() {
            Some(m) => m.to_string(),
            None => generic_rejection(status),
        }
    }

    /// `marcadas` count returned by the mark-read endpoint.
    pub fn marked_count(&self) -> u64 {
        self.payload
            .get("marcadas")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0)
    }
}

pub fn generic_rejection(status: u16) -> String {
    format!("Error al procesar la solicitud (HTTP {status})")
}

// ─── Tests ────────────────────────────────────────────────────────
