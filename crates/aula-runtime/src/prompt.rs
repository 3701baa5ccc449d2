//! Terminal presenter for the modal host: prints each request and reads the
//! confirmation answer from stdin, or answers yes on its own with `--yes`.

use std::io::Write;
use std::sync::Arc;

use aula_client::{ModalAnswer, ModalHost, ModalKind, ModalRequest, spawn_auto_responder};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

pub fn spawn_presenter(host: &Arc<ModalHost>, auto_confirm: bool) -> JoinHandle<()> {
    if auto_confirm {
        let (responder, mut seen) = spawn_auto_responder(host, ModalAnswer::Accepted);
        return tokio::spawn(async move {
            while let Some(request) = seen.recv().await {
                println!("{}", format_request(&request));
                if request.kind == ModalKind::Confirm {
                    println!("  (sí)");
                }
            }
            responder.abort();
        });
    }

    let mut current = host.subscribe();
    let weak = Arc::downgrade(host);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while current.changed().await.is_ok() {
            let Some(request) = current.borrow_and_update().clone() else {
                continue;
            };
            println!("{}", format_request(&request));
            let answer = match request.kind {
                ModalKind::Alert => ModalAnswer::Accepted,
                ModalKind::Confirm => {
                    print!("  [s/N] ");
                    let _ = std::io::stdout().flush();
                    match lines.next_line().await {
                        Ok(Some(line)) => parse_answer(&line),
                        Ok(None) => ModalAnswer::Dismissed,
                        Err(e) => {
                            tracing::warn!(error = %e, "prompt: cannot read stdin");
                            ModalAnswer::Dismissed
                        }
                    }
                }
            };
            let Some(host) = weak.upgrade() else {
                break;
            };
            if !host.respond(request.id, answer) {
                tracing::debug!(id = request.id, "prompt: request was replaced before the answer");
            }
        }
    })
}

pub fn format_request(request: &ModalRequest) -> String {
    format!("[{}] {}", request.title, request.message)
}

/// Anything but an explicit yes declines.
pub fn parse_answer(line: &str) -> ModalAnswer {
    match line.trim().to_lowercase().as_str() {
        "s" | "si" | "sí" | "y" | "yes" => ModalAnswer::Accepted,
        _ => ModalAnswer::Declined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aula_client::modal::{ALERT_TITLE, CONFIRM_TITLE};

    #[test]
    fn parse_answer_accepts_only_yes() {
        for yes in ["s", "Sí", " si ", "y", "YES"] {
            assert_eq!(parse_answer(yes), ModalAnswer::Accepted, "{yes}");
        }
        for no in ["", "n", "no", "quizás"] {
            assert_eq!(parse_answer(no), ModalAnswer::Declined, "{no}");
        }
    }

    #[test]
    fn format_request_shows_title() {
        let request = ModalRequest {
            id: 1,
            kind: ModalKind::Confirm,
            title: CONFIRM_TITLE.into(),
            message: "¿Rechazar esta citación?".into(),
        };
        assert_eq!(
            format_request(&request),
            "[Confirmar acción] ¿Rechazar esta citación?"
        );
    }

    #[tokio::test]
    async fn auto_presenter_confirms_and_acknowledges() {
        let host = Arc::new(ModalHost::new());
        let _presenter = spawn_presenter(&host, true);
        assert!(host.confirm("¿Seguro?").await);
        assert_eq!(
            host.alert("Listo", Some(ALERT_TITLE)).await,
            ModalAnswer::Accepted
        );
    }
}
