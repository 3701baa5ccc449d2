//! aula-core: pure state and wire types for the action & notification client.
//! No IO, no async. Everything here is driven by `aula-client` and unit-tested
//! in isolation.

pub mod error;
pub mod event;
pub mod feed;
pub mod overlay;
pub mod registry;
pub mod types;
pub mod ui;

pub use error::CoreError;
pub use event::{InboxEntry, NotificationEvent, StreamFrame};
pub use feed::{FeedEntry, NotificationFeed, UnreadCounter};
pub use overlay::BusyOverlay;
pub use registry::{ActionRegistry, ActionSpec, Completion};
pub use types::{
    ActionKind, ActionStatus, ControlId, PendingAction, ResponseEnvelope, TargetId,
};
pub use ui::{FrameEffect, RowList, UiState};
