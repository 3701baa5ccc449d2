//! Action registry: maps an action kind to its endpoint template, completion
//! policy and optional confirmation prompt. Populated once at mount.

use std::collections::HashMap;

use crate::error::CoreError;
use crate::types::{ActionKind, TargetId};

/// What the caller does with the displayed list after `ok == true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Drop the target's row locally, no re-fetch.
    RemoveRow,
    /// Ask for a full view reload.
    Reload,
    /// Keep the list and show this acknowledgement.
    Acknowledge(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSpec {
    /// Path with an `{id}` placeholder, e.g. `/citaciones/{id}/aprobar/`.
    pub path_template: String,
    pub completion: Completion,
    pub confirm: Option<String>,
}

impl ActionSpec {
    pub fn new(path_template: impl Into<String>, completion: Completion) -> Self {
        Self {
            path_template: path_template.into(),
            completion,
            confirm: None,
        }
    }

    pub fn with_confirm(mut self, prompt: impl Into<String>) -> Self {
        self.confirm = Some(prompt.into());
        self
    }

    pub fn endpoint_for(&self, target: &TargetId) -> Result<String, CoreError> {
        validate_target(target)?;
        Ok(self.path_template.replace("{id}", target.as_str()))
    }
}

/// Target ids are substituted into URL paths verbatim.
pub fn validate_target(target: &TargetId) -> Result<(), CoreError> {
    if target.is_blank() {
        return Err(CoreError::InvalidAction("empty target id".into()));
    }
    if matches!(target.as_str(), "." | "..") {
        return Err(CoreError::InvalidAction(format!(
            "target id {target:?} is a dot segment"
        )));
    }
    if target
        .as_str()
        .chars()
        .any(|c| c == '/' || c == '?' || c == '#' || c.is_whitespace())
    {
        return Err(CoreError::InvalidAction(format!(
            "target id {target:?} is not a path segment"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    specs: HashMap<ActionKind, ActionSpec>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Citation endpoints exposed by the school administration service.
    pub fn citation_defaults() -> Self {
        let mut reg = Self::new();
        reg.register(
            ActionKind::Approve,
            ActionSpec::new("/citaciones/{id}/aprobar/", Completion::RemoveRow),
        );
        reg.register(
            ActionKind::Reject,
            ActionSpec::new("/citaciones/{id}/rechazar/", Completion::RemoveRow)
                .with_confirm("¿Rechazar esta citación?"),
        );
        reg.register(
            ActionKind::Notify,
            ActionSpec::new(
                "/citaciones/{id}/notificar/",
                Completion::Acknowledge("Notificación enviada al padre de familia.".into()),
            ),
        );
        reg
    }

    /// Register (or replace) the spec for `kind`.
    pub fn register(&mut self, kind: ActionKind, spec: ActionSpec) -> Option<ActionSpec> {
        self.specs.insert(kind, spec)
    }

    pub fn get(&self, kind: &ActionKind) -> Option<&ActionSpec> {
        self.specs.get(kind)
    }

    /// Completion policy for `kind`; unregistered kinds reload.
    pub fn completion_for(&self, kind: &ActionKind) -> Completion {
        self.specs
            .get(kind)
            .map(|s| s.completion.clone())
            .unwrap_or(Completion::Reload)
    }

    pub fn confirm_prompt(&self, kind: &ActionKind) -> Option<&str> {
        self.specs.get(kind).and_then(|s| s.confirm.as_deref())
    }

    /// Resolve the endpoint path, preferring an explicit override.
    pub fn resolve_endpoint(
        &self,
        kind: &ActionKind,
        target: &TargetId,
        explicit: Option<&str>,
    ) -> Result<String, CoreError> {
        validate_target(target)?;
        if let Some(path) = explicit.map(str::trim).filter(|p| !p.is_empty()) {
            return Ok(path.replace("{id}", target.as_str()));
        }
        match self.specs.get(kind) {
            Some(spec) => spec.endpoint_for(target),
            None => Err(CoreError::InvalidAction(format!(
                "no endpoint registered for action `{kind}`"
            ))),
        }
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
