//! Action client: single-flight, bounded-wait state transitions.
//!
//! ```text
//! perform(request)
//!   ├─ resolve endpoint ........ Validation error (not shown)
//!   ├─ control in flight? ...... Skipped
//!   ├─ confirm prompt? ......... Declined
//!   ├─ InFlightGuard ........... overlay on, control disabled
//!   ├─ POST (bounded wait)
//!   ├─ guard released .......... overlay off, control enabled
//!   └─ 3xx → Reload | ok → completion policy | error → alert
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use aula_core::types::generic_rejection;
use aula_core::{
    ActionKind, ActionRegistry, Completion, ControlId, PendingAction, ResponseEnvelope, TargetId,
};

use crate::error::ActionError;
use crate::guard::{InFlightGuard, SharedUi, lock_ui};
use crate::modal::ModalHost;
use crate::transport::{Reply, Transport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub target: TargetId,
    pub kind: ActionKind,
    /// Overrides the registry path; may contain `{id}`.
    pub endpoint: Option<String>,
    pub params: BTreeMap<String, String>,
}

impl ActionRequest {
    pub fn new(kind: ActionKind, target: impl Into<TargetId>) -> Self {
        Self {
            target: target.into(),
            kind,
            endpoint: None,
            params: BTreeMap::new(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn control(&self) -> ControlId {
        ControlId::for_action(&self.kind, &self.target)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The control already had an action in flight; nothing was sent.
    Skipped,
    /// The confirmation prompt was declined; nothing was sent.
    Declined,
    RowRemoved(TargetId),
    Reload,
    Acknowledged(String),
}

/// Server verdict before the completion policy is applied.
enum Verdict {
    Redirected,
    Accepted(ResponseEnvelope),
}

pub struct ActionClient {
    transport: Arc<Transport>,
    registry: ActionRegistry,
    ui: SharedUi,
    modal: Arc<ModalHost>,
}

impl ActionClient {
    pub fn new(
        transport: Arc<Transport>,
        registry: ActionRegistry,
        ui: SharedUi,
        modal: Arc<ModalHost>,
    ) -> Self {
        Self {
            transport,
            registry,
            ui,
            modal,
        }
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn ui(&self) -> &SharedUi {
        &self.ui
    }

    /// Run `request` on its default control (`<kind>:<target>`).
    pub async fn perform(&self, request: ActionRequest) -> Result<ActionOutcome, ActionError> {
        let control = request.control();
        self.perform_on(&control, request).await
    }

    /// Run `request` on an explicit control.
    pub async fn perform_on(
        &self,
        control: &ControlId,
        request: ActionRequest,
    ) -> Result<ActionOutcome, ActionError> {
        let endpoint = match self.registry.resolve_endpoint(
            &request.kind,
            &request.target,
            request.endpoint.as_deref(),
        ) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                tracing::warn!(kind = %request.kind, target = %request.target, error = %e, "action: invalid request");
                return Err(ActionError::Validation(e));
            }
        };

        if lock_ui(&self.ui).is_in_flight(control) {
            tracing::debug!(%control, "action: already in flight, ignoring");
            return Ok(ActionOutcome::Skipped);
        }

        if let Some(prompt) = self.registry.confirm_prompt(&request.kind) {
            if !self.modal.confirm(prompt).await {
                tracing::debug!(%control, "action: declined at confirmation");
                return Ok(ActionOutcome::Declined);
            }
        }

        let pending = PendingAction::new(request.target.clone(), request.kind.clone());
        let Some(mut guard) = InFlightGuard::try_acquire(&self.ui, control.clone(), pending) else {
            tracing::debug!(%control, "action: started elsewhere while confirming");
            return Ok(ActionOutcome::Skipped);
        };
        tracing::debug!(%control, %endpoint, "action: in flight");

        let verdict = self.send(&endpoint, &request.params).await;
        if verdict.is_ok() {
            guard.mark_success();
        }
        if let Some(settled) = guard.release() {
            tracing::debug!(%control, status = ?settled.status, "action: settled");
        }

        match verdict {
            Ok(Verdict::Redirected) => {
                lock_ui(&self.ui).request_reload();
                tracing::info!(kind = %request.kind, target = %request.target, "action: redirected, reload requested");
                Ok(ActionOutcome::Reload)
            }
            Ok(Verdict::Accepted(envelope)) => Ok(self.complete(&request, &envelope).await),
            Err(err) => {
                tracing::warn!(kind = %request.kind, target = %request.target, error = %err, "action failed");
                self.modal.alert(&err.user_message(), None).await;
                Err(err)
            }
        }
    }

    async fn send(
        &self,
        endpoint: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<Verdict, ActionError> {
        match self.transport.post_form(endpoint, params).await? {
            Reply::Redirect { .. } => Ok(Verdict::Redirected),
            Reply::Body { status, body } => {
                let envelope = match ResponseEnvelope::from_slice(&body) {
                    Ok(env) => env,
                    Err(e) => {
                        tracing::debug!(status, error = %e, "action: undecodable response body");
                        return Err(ActionError::Rejected(generic_rejection(status)));
                    }
                };
                if (200..300).contains(&status) && envelope.ok {
                    Ok(Verdict::Accepted(envelope))
                } else {
                    Err(ActionError::Rejected(envelope.rejection_message(status)))
                }
            }
        }
    }

    async fn complete(&self, request: &ActionRequest, envelope: &ResponseEnvelope) -> ActionOutcome {
        match self.registry.completion_for(&request.kind) {
            Completion::RemoveRow => {
                let removed = lock_ui(&self.ui).rows.remove(&request.target);
                tracing::info!(kind = %request.kind, target = %request.target, removed, "action: done");
                ActionOutcome::RowRemoved(request.target.clone())
            }
            Completion::Reload => {
                lock_ui(&self.ui).request_reload();
                tracing::info!(kind = %request.kind, target = %request.target, "action: done, reload requested");
                ActionOutcome::Reload
            }
            Completion::Acknowledge(default) => {
                let message = envelope
                    .message
                    .as_deref()
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .unwrap_or(&default)
                    .to_string();
                tracing::info!(kind = %request.kind, target = %request.target, "action: done");
                self.modal.alert(&message, None).await;
                ActionOutcome::Acknowledged(message)
            }
        }
    }
}
