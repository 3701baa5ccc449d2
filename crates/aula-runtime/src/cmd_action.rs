//! `aula approve|reject|notify|action`: run one action per id over a row
//! list built from the ids, then print what is left.

use aula_client::{ActionClient, ActionOutcome, ActionRequest, lock_ui};
use aula_core::{ActionKind, ActionRegistry, TargetId};

use crate::cli::GlobalOpts;
use crate::context::Context;

/// A single action to run per id.
pub struct ActionPlan {
    pub kind: ActionKind,
    pub endpoint: Option<String>,
    pub params: Vec<(String, String)>,
}

impl ActionPlan {
    pub fn builtin(kind: ActionKind) -> Self {
        Self {
            kind,
            endpoint: None,
            params: Vec::new(),
        }
    }

    fn request_for(&self, id: &str) -> ActionRequest {
        let mut request = ActionRequest::new(self.kind.clone(), id);
        if let Some(endpoint) = &self.endpoint {
            request = request.with_endpoint(endpoint.clone());
        }
        for (key, value) in &self.params {
            request = request.with_param(key.clone(), value.clone());
        }
        request
    }
}

/// Returns `false` if any action failed.
pub async fn cmd_action(opts: &GlobalOpts, plan: ActionPlan, ids: &[String]) -> anyhow::Result<bool> {
    let ctx = Context::new(opts, ids.iter().map(|id| TargetId::new(id.as_str())))?;
    let client = ActionClient::new(
        ctx.transport.clone(),
        ActionRegistry::citation_defaults(),
        ctx.ui.clone(),
        ctx.modal.clone(),
    );

    let mut all_ok = true;
    for id in ids {
        match client.perform(plan.request_for(id)).await {
            Ok(outcome) => println!("{id}: {}", describe_outcome(&outcome)),
            Err(e) => {
                all_ok = false;
                tracing::debug!(id, error = %e, "action failed");
                println!("{id}: error: {}", e.user_message());
            }
        }
    }

    let state = lock_ui(&ctx.ui);
    let rows: Vec<&str> = state.rows.iter().map(TargetId::as_str).collect();
    println!("{}", format_summary(&rows, state.reload_requested()));
    Ok(all_ok)
}

pub fn describe_outcome(outcome: &ActionOutcome) -> String {
    match outcome {
        ActionOutcome::Skipped => "skipped (already in flight)".to_string(),
        ActionOutcome::Declined => "cancelled".to_string(),
        ActionOutcome::RowRemoved(target) => format!("done, row {target} removed"),
        ActionOutcome::Reload => "done, reload requested".to_string(),
        ActionOutcome::Acknowledged(message) => format!("done: {message}"),
    }
}

pub fn format_summary(rows: &[&str], reload: bool) -> String {
    let rows = if rows.is_empty() {
        "(none)".to_string()
    } else {
        rows.join(", ")
    };
    format!("remaining rows: {rows}\nreload requested: {}", if reload { "yes" } else { "no" })
}
