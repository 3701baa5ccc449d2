//! Error types for the action client, credentials and the event stream.

use std::time::Duration;

use aula_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential `{name}` is not a valid header value")]
    InvalidHeader { name: String },

    #[error("invalid header name: {0}")]
    InvalidHeaderName(String),
}

#[derive(Debug, Error)]
pub enum ActionError {
    /// Caught before any request was sent. Never shown in the modal.
    #[error("validation failed: {0}")]
    Validation(#[from] CoreError),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// `ok == false`, or a body that could not be decoded.
    #[error("rejected by server: {0}")]
    Rejected(String),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl ActionError {
    /// Human-readable text for the alert modal.
    pub fn user_message(&self) -> String {
        match self {
            Self::Timeout(_) => "Tiempo de espera agotado. Intenta de nuevo.".to_string(),
            Self::Network(e) => format!("Error de red: {e}"),
            Self::Rejected(msg) => msg.clone(),
            Self::Validation(e) => e.to_string(),
            Self::Credential(e) => format!("Credenciales inválidas: {e}"),
            Self::Url(e) => format!("Dirección inválida: {e}"),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("invalid stream url: {0}")]
    Url(String),

    #[error("websocket connect failed: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_is_distinct() {
        let err = ActionError::Timeout(Duration::from_millis(8000));
        assert!(err.is_timeout());
        assert!(err.to_string().contains("8000ms"));
        assert!(err.user_message().starts_with("Tiempo de espera"));
    }

    #[test]
    fn rejected_message_is_shown_verbatim() {
        let err = ActionError::Rejected("Citación ya procesada".into());
        assert_eq!(err.user_message(), "Citación ya procesada");
        assert!(!err.is_timeout());
    }
}
