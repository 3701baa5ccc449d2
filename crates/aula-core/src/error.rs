//! Error types for frame parsing and pre-request validation.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("frame has no `type` discriminator")]
    MissingFrameType,

    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("unknown action kind: {0}")]
    UnknownActionKind(String),
}
