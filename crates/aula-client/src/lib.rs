//! aula-client: async side of the action & notification client.
//!
//! - [`ActionClient`] posts confirmed actions with single-flight per control
//!   and a scoped busy overlay, then applies the completion policy.
//! - [`EventSubscriber`] consumes the notification stream and drives the
//!   unread counter and feed.
//! - [`ModalHost`] is the single confirm/alert slot both of them share.
//!
//! State lives in an [`aula_core::UiState`] behind a [`SharedUi`] handle.

pub mod action;
pub mod credentials;
pub mod error;
pub mod guard;
pub mod modal;
pub mod notifications;
pub mod stream;
pub mod transport;

pub use action::{ActionClient, ActionOutcome, ActionRequest};
pub use credentials::{
    Anonymous, CookieCredentials, CredentialChain, CredentialProvider, HeaderToken,
};
pub use error::{ActionError, CredentialError, StreamError};
pub use guard::{InFlightGuard, SharedUi, lock_ui, shared_ui};
pub use modal::{ModalAnswer, ModalHost, ModalKind, ModalRequest, spawn_auto_responder};
pub use notifications::NotificationApi;
pub use stream::{ConnectionState, EventSubscriber, ReconnectPolicy, stream_url};
pub use transport::{DEFAULT_TIMEOUT, Reply, Transport};
