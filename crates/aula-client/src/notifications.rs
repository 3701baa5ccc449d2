//! "Mark all read": resets the unread badge once the server confirms.

use std::collections::BTreeMap;
use std::sync::Arc;

use aula_core::ResponseEnvelope;
use aula_core::types::generic_rejection;

use crate::error::ActionError;
use crate::guard::{SharedUi, lock_ui};
use crate::transport::{Reply, Transport};

pub const MARK_READ_PATH: &str = "/notifs/marcar-leidas/";

pub struct NotificationApi {
    transport: Arc<Transport>,
    ui: SharedUi,
    mark_read_path: String,
}

impl NotificationApi {
    pub fn new(transport: Arc<Transport>, ui: SharedUi) -> Self {
        Self {
            transport,
            ui,
            mark_read_path: MARK_READ_PATH.to_string(),
        }
    }

    pub fn with_mark_read_path(mut self, path: impl Into<String>) -> Self {
        self.mark_read_path = path.into();
        self
    }

    /// Returns the number of notifications the server marked.
    /// Independent of the stream connection state.
    pub async fn mark_all_read(&self) -> Result<u64, ActionError> {
        let reply = self
            .transport
            .post_form(&self.mark_read_path, &BTreeMap::new())
            .await?;

        let (status, body) = match reply {
            Reply::Body { status, body } => (status, body),
            Reply::Redirect { status, location } => {
                tracing::warn!(status, ?location, "mark-read: unexpected redirect (session expired?)");
                return Err(ActionError::Rejected(generic_rejection(status)));
            }
        };

        let envelope = ResponseEnvelope::from_slice(&body)
            .map_err(|_| ActionError::Rejected(generic_rejection(status)))?;
        if !(200..300).contains(&status) || !envelope.ok {
            return Err(ActionError::Rejected(envelope.rejection_message(status)));
        }

        let marked = envelope.marked_count();
        lock_ui(&self.ui).mark_all_read();
        tracing::info!(marked, "notifications marked read");
        Ok(marked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use aula_core::UiState;

    use crate::credentials::Anonymous;
    use crate::guard::shared_ui;
    use crate::transport::DEFAULT_TIMEOUT;
    use crate::transport::test_support::*;

    async fn api(response: String) -> (NotificationApi, SharedUi, TestHttp) {
        let server = serve(vec![response], Duration::ZERO).await;
        let transport = Arc::new(
            Transport::new(&server.base_url(), Arc::new(Anonymous), DEFAULT_TIMEOUT)
                .expect("transport"),
        );
        let ui = shared_ui(UiState::new());
        (NotificationApi::new(transport, Arc::clone(&ui)), ui, server)
    }

    #[tokio::test]
    async fn mark_all_read_resets_counter() {
        let (api, ui, mut server) = api(json_response(200, r#"{"ok":true,"marcadas":5}"#)).await;
        lock_ui(&ui).counter.increment(9);

        assert_eq!(api.mark_all_read().await.expect("marked"), 5);
        assert_eq!(lock_ui(&ui).counter.get(), 0);
        assert_eq!(lock_ui(&ui).counter.badge(), None);

        let request = server.requests.recv().await.expect("request");
        assert!(request.starts_with("POST /notifs/marcar-leidas/"));
    }

    #[tokio::test]
    async fn missing_count_defaults_to_zero() {
        let (api, _ui, _server) = api(json_response(200, r#"{"ok":true}"#)).await;
        assert_eq!(api.mark_all_read().await.expect("marked"), 0);
    }

    #[tokio::test]
    async fn rejected_request_keeps_counter() {
        let (api, ui, _server) =
            api(json_response(405, r#"{"ok":false,"error":"Método no permitido"}"#)).await;
        lock_ui(&ui).counter.increment(2);
        let err = api.mark_all_read().await.expect_err("rejected");
        assert_eq!(err.user_message(), "Método no permitido");
        assert_eq!(lock_ui(&ui).counter.get(), 2);
    }

    #[tokio::test]
    async fn ok_body_with_error_status_keeps_counter() {
        let (api, ui, _server) = api(json_response(500, r#"{"ok":true,"marcadas":3}"#)).await;
        lock_ui(&ui).counter.increment(4);
        let err = api.mark_all_read().await.expect_err("rejected");
        assert!(err.user_message().contains("HTTP 500"), "{err}");
        assert_eq!(lock_ui(&ui).counter.get(), 4);
    }

    #[tokio::test]
    async fn redirect_is_rejected() {
        let (api, _ui, _server) = api(redirect_response("/login/")).await;
        assert!(matches!(
            api.mark_all_read().await,
            Err(ActionError::Rejected(_))
        ));
    }
}
