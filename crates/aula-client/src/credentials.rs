//! Request authentication.
//!
//! In a browser the session cookie travels implicitly and the CSRF token is
//! read from the `csrftoken` cookie. Outside a browser both become explicit
//! headers, so every provider yields a `HeaderMap` that is merged into each
//! action request and into the WebSocket handshake.

use http::header::{COOKIE, HeaderMap, HeaderName, HeaderValue};

use crate::error::CredentialError;

pub const CSRF_COOKIE: &str = "csrftoken";
pub const CSRF_HEADER: &str = "X-CSRFToken";

pub trait CredentialProvider: Send + Sync {
    fn auth_headers(&self) -> Result<HeaderMap, CredentialError>;
}

/// Read a named cookie from a `Cookie` header string (`a=1; b=2`).
/// Values are percent-decoded; undecodable values are returned raw.
pub fn get_cookie(cookie_header: &str, name: &str) -> Option<String> {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| k.trim() == name)
        .map(|(_, v)| {
            let v = v.trim();
            urlencoding::decode(v)
                .map(|d| d.into_owned())
                .unwrap_or_else(|_| v.to_string())
        })
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, CredentialError> {
    HeaderValue::from_str(value).map_err(|_| CredentialError::InvalidHeader {
        name: name.to_string(),
    })
}

// ─── Providers ────────────────────────────────────────────────────

/// No authentication.
#[derive(Debug, Default, Clone, Copy)]
pub struct Anonymous;

impl CredentialProvider for Anonymous {
    fn auth_headers(&self) -> Result<HeaderMap, CredentialError> {
        Ok(HeaderMap::new())
    }
}

/// Session cookie jar: forwards the raw `Cookie` header and derives the
/// anti-forgery header from its CSRF cookie.
#[derive(Debug, Clone)]
pub struct CookieCredentials {
    cookie_header: String,
    csrf_cookie: String,
}

impl CookieCredentials {
    pub fn new(cookie_header: impl Into<String>) -> Self {
        Self {
            cookie_header: cookie_header.into(),
            csrf_cookie: CSRF_COOKIE.to_string(),
        }
    }

    pub fn with_csrf_cookie(mut self, name: impl Into<String>) -> Self {
        self.csrf_cookie = name.into();
        self
    }

    pub fn csrf_token(&self) -> Option<String> {
        get_cookie(&self.cookie_header, &self.csrf_cookie)
    }
}

impl CredentialProvider for CookieCredentials {
    fn auth_headers(&self) -> Result<HeaderMap, CredentialError> {
        let mut headers = HeaderMap::new();
        if self.cookie_header.trim().is_empty() {
            return Ok(headers);
        }
        headers.insert(COOKIE, header_value("Cookie", self.cookie_header.trim())?);
        if let Some(token) = self.csrf_token() {
            headers.insert(
                HeaderName::from_static("x-csrftoken"),
                header_value(CSRF_HEADER, &token)?,
            );
        }
        Ok(headers)
    }
}

/// A fixed header, e.g. `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct HeaderToken {
    name: HeaderName,
    value: HeaderValue,
}

impl HeaderToken {
    pub fn new(name: &str, value: &str) -> Result<Self, CredentialError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| CredentialError::InvalidHeaderName(name.to_string()))?;
        let mut value = header_value(name.as_str(), value)?;
        value.set_sensitive(true);
        Ok(Self { name, value })
    }
}

impl CredentialProvider for HeaderToken {
    fn auth_headers(&self) -> Result<HeaderMap, CredentialError> {
        let mut headers = HeaderMap::new();
        headers.insert(self.name.clone(), self.value.clone());
        Ok(headers)
    }
}

/// Several providers merged in order; later providers override earlier ones.
#[derive(Default)]
pub struct CredentialChain {
    providers: Vec<Box<dyn CredentialProvider>>,
}

impl CredentialChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: impl CredentialProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl CredentialProvider for CredentialChain {
    fn auth_headers(&self) -> Result<HeaderMap, CredentialError> {
        let mut merged = HeaderMap::new();
        for provider in &self.providers {
            for (name, value) in provider.auth_headers()?.iter() {
                merged.insert(name.clone(), value.clone());
            }
        }
        Ok(merged)
    }
}
