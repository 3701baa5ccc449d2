//! Notification stream subscriber.
//!
//! `Disconnected → Connecting → Connected → Disconnected`. While connected
//! every text frame is parsed and applied to the shared UI state; malformed
//! frames are dropped without closing the connection. Reconnection is off by
//! default and available as capped exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use aula_core::{FrameEffect, StreamFrame};
use chrono::Utc;
use futures_util::StreamExt;
use tokio::sync::{broadcast, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::credentials::CredentialProvider;
use crate::error::StreamError;
use crate::guard::{SharedUi, lock_ui};

pub const NOTIFS_PATH: &str = "/ws/notifs/";

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    Never,
    /// Delay doubles after each failed attempt up to `max`, and restarts
    /// from `initial` after a session that reached `Connected`.
    Backoff { initial: Duration, max: Duration },
}

impl ReconnectPolicy {
    fn next_delay(self, previous: Option<Duration>, was_connected: bool) -> Option<Duration> {
        match self {
            Self::Never => None,
            Self::Backoff { initial, max } => Some(match previous {
                Some(prev) if !was_connected => prev.saturating_mul(2).min(max),
                _ => initial.min(max),
            }),
        }
    }
}

/// Derive the stream URL from the HTTP base: `http→ws`, `https→wss`,
/// plus `?uid=<id>` when the subscriber is known.
pub fn stream_url(base: &Url, path: &str, uid: Option<&str>) -> Result<Url, StreamError> {
    let mut url = base.join(path).map_err(|e| StreamError::Url(e.to_string()))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(StreamError::Url(format!("unsupported scheme `{other}`"))),
    };
    url.set_scheme(scheme)
        .map_err(|_| StreamError::Url(format!("cannot switch {base} to {scheme}")))?;
    url.set_query(None);
    if let Some(uid) = uid.map(str::trim).filter(|u| !u.is_empty()) {
        url.query_pairs_mut().append_pair("uid", uid);
    }
    Ok(url)
}

pub struct EventSubscriber {
    url: Url,
    credentials: Arc<dyn CredentialProvider>,
    ui: SharedUi,
    policy: ReconnectPolicy,
    state: watch::Sender<ConnectionState>,
    effects: broadcast::Sender<FrameEffect>,
}

impl EventSubscriber {
    pub fn new(url: Url, credentials: Arc<dyn CredentialProvider>, ui: SharedUi) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (effects, _) = broadcast::channel(64);
        Self {
            url,
            credentials,
            ui,
            policy: ReconnectPolicy::Never,
            state,
            effects,
        }
    }

    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Receive the effect of every applied frame.
    pub fn subscribe(&self) -> broadcast::Receiver<FrameEffect> {
        self.effects.subscribe()
    }

    fn set_state(&self, next: ConnectionState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            tracing::debug!(?prev, ?next, "stream: state change");
        }
    }

    /// Parse one text frame and apply it. `None` if the frame was discarded.
    pub fn handle_text(&self, text: &str) -> Option<FrameEffect> {
        let frame = match StreamFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!(error = %e, len = text.len(), "stream: discarding malformed frame");
                return None;
            }
        };
        let effect = lock_ui(&self.ui).apply_frame(frame, Utc::now());
        match &effect {
            FrameEffect::Counted { delta, unread, .. } => {
                tracing::debug!(delta, unread, "stream: notification");
            }
            FrameEffect::Inbox(entry) => {
                tracing::debug!(citation = ?entry.citation_id, "stream: inbox proposal");
            }
            FrameEffect::Ignored(tag) => tracing::debug!(tag = %tag, "stream: unrecognized frame type"),
        }
        let _ = self.effects.send(effect.clone());
        Some(effect)
    }

    /// Run until cancelled, or until the connection ends when reconnect is off.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), StreamError> {
        let mut delay = None;
        loop {
            let result = self.session(&cancel).await;
            if cancel.is_cancelled() {
                return Ok(());
            }
            let was_connected = match &result {
                Ok(connected) => *connected,
                Err(e) => {
                    tracing::warn!(url = %self.url, error = %e, "stream: connect failed");
                    false
                }
            };
            let Some(wait) = self.policy.next_delay(delay, was_connected) else {
                return result.map(|_| ());
            };
            delay = Some(wait);
            tracing::info!(retry_in_ms = wait.as_millis() as u64, "stream: reconnecting");
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// One connection attempt. `Ok(true)` if it reached `Connected`.
    async fn session(&self, cancel: &CancellationToken) -> Result<bool, StreamError> {
        self.set_state(ConnectionState::Connecting);
        let ws = tokio::select! {
            _ = cancel.cancelled() => {
                self.set_state(ConnectionState::Disconnected);
                return Ok(false);
            }
            result = self.connect() => match result {
                Ok(ws) => ws,
                Err(e) => {
                    self.set_state(ConnectionState::Disconnected);
                    return Err(e);
                }
            },
        };
        self.set_state(ConnectionState::Connected);
        tracing::info!(url = %self.url, "stream: connected");

        self.pump(ws, cancel).await;
        self.set_state(ConnectionState::Disconnected);
        Ok(true)
    }

    async fn connect(&self) -> Result<WsStream, StreamError> {
        let mut request = self.url.as_str().into_client_request()?;
        request
            .headers_mut()
            .extend(self.credentials.auth_headers()?);
        let (ws, _response) = tokio_tungstenite::connect_async(request).await?;
        Ok(ws)
    }

    async fn pump(&self, mut ws: WsStream, cancel: &CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = ws.close(None).await;
                    tracing::info!("stream: closed by client");
                    return;
                }
                msg = ws.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        self.handle_text(&text);
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(?frame, "stream: closed by server");
                        return;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "stream: read error");
                        return;
                    }
                    None => {
                        tracing::info!("stream: ended");
                        return;
                    }
                },
            }
        }
    }
}
