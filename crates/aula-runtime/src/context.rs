//! Wiring shared by every subcommand: credentials, transport, UI state and
//! the modal host with its terminal presenter.

use std::sync::Arc;
use std::time::Duration;

use aula_client::{
    Anonymous, CookieCredentials, CredentialChain, CredentialProvider, HeaderToken, ModalHost,
    SharedUi, Transport, shared_ui,
};
use aula_core::{TargetId, UiState};
use tokio::task::JoinHandle;

use crate::cli::GlobalOpts;
use crate::prompt;

pub struct Context {
    pub transport: Arc<Transport>,
    pub ui: SharedUi,
    pub modal: Arc<ModalHost>,
    presenter: JoinHandle<()>,
}

impl Context {
    /// `rows` become the displayed row list actions remove from.
    pub fn new(opts: &GlobalOpts, rows: impl IntoIterator<Item = TargetId>) -> anyhow::Result<Self> {
        let credentials = credentials_from(opts)?;
        let transport = Transport::new(
            &opts.base_url,
            credentials,
            Duration::from_millis(opts.timeout_ms),
        )
        .map_err(|e| anyhow::anyhow!("invalid base url {}: {e}", opts.base_url))?;
        let modal = Arc::new(ModalHost::new());
        let presenter = prompt::spawn_presenter(&modal, opts.yes);
        Ok(Self {
            transport: Arc::new(transport),
            ui: shared_ui(UiState::with_rows(rows)),
            modal,
            presenter,
        })
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.presenter.abort();
    }
}

/// Cookie first, then the token header; nothing configured means anonymous.
pub fn credentials_from(opts: &GlobalOpts) -> anyhow::Result<Arc<dyn CredentialProvider>> {
    let mut chain = CredentialChain::new();
    if let Some(cookie) = opts.cookie.as_deref().filter(|c| !c.trim().is_empty()) {
        let creds = CookieCredentials::new(cookie);
        if creds.csrf_token().is_none() {
            tracing::warn!("cookie has no csrftoken; state-changing requests may be refused");
        }
        chain = chain.with(creds);
    }
    if let Some(token) = opts.token.as_deref().filter(|t| !t.trim().is_empty()) {
        chain = chain.with(HeaderToken::new(&opts.token_header, token)?);
    }
    if chain.is_empty() {
        tracing::debug!("no credentials configured");
        return Ok(Arc::new(Anonymous));
    }
    Ok(Arc::new(chain))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> GlobalOpts {
        GlobalOpts {
            base_url: "http://127.0.0.1:8000".into(),
            cookie: None,
            token: None,
            token_header: "Authorization".into(),
            timeout_ms: 8000,
            yes: true,
        }
    }

    #[test]
    fn no_credentials_is_anonymous() {
        let headers = credentials_from(&opts()).unwrap().auth_headers().unwrap();
        assert!(headers.is_empty());
    }

    #[test]
    fn cookie_and_token_are_merged() {
        let mut o = opts();
        o.cookie = Some("sessionid=s; csrftoken=t".into());
        o.token = Some("Bearer abc".into());
        let headers = credentials_from(&o).unwrap().auth_headers().unwrap();
        assert_eq!(headers["cookie"], "sessionid=s; csrftoken=t");
        assert_eq!(headers["x-csrftoken"], "t");
        assert_eq!(headers["authorization"], "Bearer abc");
    }

    #[test]
    fn bad_token_header_is_an_error() {
        let mut o = opts();
        o.token = Some("abc".into());
        o.token_header = "not a header".into();
        assert!(credentials_from(&o).is_err());
    }

    #[tokio::test]
    async fn context_rejects_bad_base_url() {
        let mut o = opts();
        o.base_url = "no-scheme".into();
        assert!(Context::new(&o, Vec::<TargetId>::new()).is_err());
    }
}
