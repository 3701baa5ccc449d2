//! `aula watch` and `aula mark-read`.

use std::time::Duration;

use aula_client::{
    ConnectionState, EventSubscriber, NotificationApi, ReconnectPolicy, StreamError, lock_ui,
    stream_url,
};
use aula_client::stream::NOTIFS_PATH;
use aula_core::{FeedEntry, FrameEffect, InboxEntry, TargetId};
use chrono::Local;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio_util::sync::CancellationToken;

use crate::cli::{GlobalOpts, WatchOpts};
use crate::context::Context;

const RECONNECT_INITIAL: Duration = Duration::from_secs(1);
const RECONNECT_MAX: Duration = Duration::from_secs(30);

/// Entry point for `aula watch`: print the badge and each new row until Ctrl-C.
pub async fn cmd_watch(opts: &GlobalOpts, watch: &WatchOpts) -> anyhow::Result<()> {
    let ctx = Context::new(opts, Vec::<TargetId>::new())?;
    lock_ui(&ctx.ui).feed.set_cap(watch.limit);

    let url = stream_url(ctx.transport.base_url(), NOTIFS_PATH, watch.uid.as_deref())?;
    let policy = if watch.reconnect {
        ReconnectPolicy::Backoff {
            initial: RECONNECT_INITIAL,
            max: RECONNECT_MAX,
        }
    } else {
        ReconnectPolicy::Never
    };
    let subscriber = EventSubscriber::new(
        url,
        ctx.transport.credentials().clone(),
        ctx.ui.clone(),
    )
    .with_reconnect(policy);

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    println!("watching {}, Ctrl-C to quit", subscriber.url());
    let result = follow(&subscriber, cancel, |line| println!("{line}")).await;
    interrupt.abort();
    result?;
    Ok(())
}

/// Drive `subscriber` until it stops, handing every rendered line to `emit`
/// in arrival order. Effects still queued when the stream ends are flushed
/// before returning.
pub async fn follow(
    subscriber: &EventSubscriber,
    cancel: CancellationToken,
    mut emit: impl FnMut(String),
) -> Result<(), StreamError> {
    let mut effects = subscriber.subscribe();
    let mut states = subscriber.watch_state();
    let run = subscriber.run(cancel);
    tokio::pin!(run);

    let result = loop {
        tokio::select! {
            biased;
            received = effects.recv() => match received {
                Ok(effect) => {
                    if let Some(line) = render_effect(&effect) {
                        emit(line);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "watch: output fell behind, rows skipped");
                }
                Err(RecvError::Closed) => {}
            },
            Ok(()) = states.changed() => {
                let state = *states.borrow_and_update();
                emit(format_state(state).to_string());
            }
            result = &mut run => break result,
        }
    };

    loop {
        match effects.try_recv() {
            Ok(effect) => {
                if let Some(line) = render_effect(&effect) {
                    emit(line);
                }
            }
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "watch: output fell behind, rows skipped");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    result
}

pub fn render_effect(effect: &FrameEffect) -> Option<String> {
    match effect {
        FrameEffect::Counted { unread, entry, .. } => {
            Some(format!("{}  {}", format_badge(*unread), format_entry(entry)))
        }
        FrameEffect::Inbox(entry) => Some(format_inbox(entry)),
        FrameEffect::Ignored(_) => None,
    }
}

/// Entry point for `aula mark-read`.
pub async fn cmd_mark_read(opts: &GlobalOpts) -> anyhow::Result<()> {
    let ctx = Context::new(opts, Vec::<TargetId>::new())?;
    let api = NotificationApi::new(ctx.transport.clone(), ctx.ui.clone());
    match api.mark_all_read().await {
        Ok(marked) => {
            println!("{marked} notification(s) marked read");
            Ok(())
        }
        Err(e) => anyhow::bail!("{}", e.user_message()),
    }
}

pub fn format_state(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Disconnected => "-- disconnected",
        ConnectionState::Connecting => ".. connecting",
        ConnectionState::Connected => "== connected",
    }
}

pub fn format_badge(unread: u64) -> String {
    if unread == 0 {
        "( )".to_string()
    } else {
        format!("({unread})")
    }
}

pub fn format_entry(entry: &FeedEntry) -> String {
    let received = entry.received_at.with_timezone(&Local).format("%H:%M:%S");
    format!("{received} {entry}")
}

pub fn format_inbox(entry: &InboxEntry) -> String {
    let mut line = match &entry.citation_id {
        Some(id) => format!("inbox: citación #{id}"),
        None => "inbox: citación".to_string(),
    };
    if let Some(student) = &entry.student {
        line.push_str(&format!(" {student}"));
    }
    if !entry.reason.is_empty() {
        line.push_str(&format!(" ({})", entry.reason));
    }
    if let Some(suggested) = &entry.suggested {
        line.push_str(&format!(", sugerido {suggested}"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use aula_client::{Anonymous, shared_ui};
    use aula_core::UiState;
    use chrono::Utc;
    use futures_util::SinkExt;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message;
    use url::Url;

    /// Accepts one connection, sends `frames`, then closes.
    async fn one_shot_server(frames: Vec<String>) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            for frame in frames {
                ws.send(Message::Text(frame)).await.unwrap();
            }
            let _ = ws.close(None).await;
        });
        addr
    }

    #[tokio::test]
    async fn follow_prints_every_row_before_returning() {
        let frames: Vec<String> = ["uno", "dos", "tres"]
            .iter()
            .enumerate()
            .map(|(i, text)| {
                format!(
                    r#"{{"type":"notify.unread","event":"citacion","citacion_id":{},"mensaje":"{text}"}}"#,
                    i + 1
                )
            })
            .collect();
        let addr = one_shot_server(frames).await;

        let ui = shared_ui(UiState::new());
        // A one-row feed must not cause rows to be repeated or lost.
        lock_ui(&ui).feed.set_cap(Some(1));
        let url = Url::parse(&format!("ws://{addr}{NOTIFS_PATH}")).unwrap();
        let subscriber = EventSubscriber::new(url, Arc::new(Anonymous), Arc::clone(&ui));

        let mut lines = Vec::new();
        tokio::time::timeout(
            Duration::from_secs(5),
            follow(&subscriber, CancellationToken::new(), |line| lines.push(line)),
        )
        .await
        .expect("follow returns when the server closes")
        .expect("clean close");

        let rows: Vec<&String> = lines.iter().filter(|l| l.starts_with('(')).collect();
        assert_eq!(rows.len(), 3, "{lines:?}");
        for (row, (n, text)) in rows.iter().zip([(1, "uno"), (2, "dos"), (3, "tres")]) {
            assert!(row.starts_with(&format!("({n})")), "{row}");
            assert!(row.ends_with(&format!("Citación #{n}: {text}")), "{row}");
        }
    }

    #[test]
    fn ignored_frames_render_nothing() {
        assert_eq!(render_effect(&FrameEffect::Ignored("cola".into())), None);
    }

    #[test]
    fn badge_hidden_at_zero() {
        assert_eq!(format_badge(0), "( )");
        assert_eq!(format_badge(4), "(4)");
    }

    #[test]
    fn entry_line_ends_with_feed_text() {
        let entry = FeedEntry {
            title: "Citación #9".into(),
            body: "Ana — Reunión".into(),
            timestamp: "2026-03-01 10:00".into(),
            received_at: Utc::now(),
        };
        let line = format_entry(&entry);
        assert!(line.ends_with("Citación #9: Ana — Reunión (2026-03-01 10:00)"), "{line}");
    }

    #[test]
    fn inbox_line_skips_missing_fields() {
        let entry = InboxEntry {
            citation_id: Some("9".into()),
            student: Some("Ana".into()),
            reason: "Conducta".into(),
            suggested: None,
            utilization: Some(0.8),
            expected_wait: None,
        };
        assert_eq!(format_inbox(&entry), "inbox: citación #9 Ana (Conducta)");
    }

    #[test]
    fn state_lines_are_distinct() {
        let lines = [
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Connected,
        ]
        .map(format_state);
        assert_ne!(lines[0], lines[1]);
        assert_ne!(lines[1], lines[2]);
    }
}
