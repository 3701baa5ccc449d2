//! HTTP transport for state-changing POSTs: form-encoded body, credential
//! headers, XHR marker, no redirect following and a bounded wait.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use http::header::CONTENT_TYPE;
use url::Url;

use crate::credentials::CredentialProvider;
use crate::error::ActionError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(8000);
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded;charset=UTF-8";

/// What came back, before any envelope interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// 3xx: ambiguous success, the body is not read.
    Redirect {
        status: u16,
        location: Option<String>,
    },
    Body {
        status: u16,
        body: Vec<u8>,
    },
}

pub struct Transport {
    http: reqwest::Client,
    base: Url,
    credentials: Arc<dyn CredentialProvider>,
    timeout: Duration,
}

impl Transport {
    pub fn new(
        base_url: &str,
        credentials: Arc<dyn CredentialProvider>,
        timeout: Duration,
    ) -> Result<Self, ActionError> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            http,
            base: Url::parse(base_url)?,
            credentials,
            timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialProvider> {
        &self.credentials
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn url_for(&self, path: &str) -> Result<Url, ActionError> {
        Ok(self.base.join(path)?)
    }

    /// POST `params` to `path`. Expiry of the bounded wait drops the
    /// in-progress request and yields `ActionError::Timeout`.
    pub async fn post_form(
        &self,
        path: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<Reply, ActionError> {
        let url = self.url_for(path)?;
        let headers = self.credentials.auth_headers()?;
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .finish();

        tracing::debug!(%url, params = params.len(), "POST");

        let send = async {
            let resp = self
                .http
                .post(url)
                .headers(headers)
                .header("X-Requested-With", "XMLHttpRequest")
                .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
                .body(body)
                .send()
                .await?;

            let status = resp.status();
            if status.is_redirection() {
                let location = resp
                    .headers()
                    .get(http::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                return Ok(Reply::Redirect {
                    status: status.as_u16(),
                    location,
                });
            }
            let body = resp.bytes().await?;
            Ok::<_, ActionError>(Reply::Body {
                status: status.as_u16(),
                body: body.to_vec(),
            })
        };

        match tokio::time::timeout(self.timeout, send).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(path, timeout_ms = self.timeout.as_millis() as u64, "request timed out");
                Err(ActionError::Timeout(self.timeout))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Minimal one-shot HTTP/1.1 server for exercising the transport.

    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::mpsc;

    pub struct TestHttp {
        pub addr: SocketAddr,
        pub requests: mpsc::UnboundedReceiver<String>,
        pub connections: Arc<AtomicUsize>,
    }

    impl TestHttp {
        pub fn base_url(&self) -> String {
            format!("http://{}", self.addr)
        }

        pub fn connection_count(&self) -> usize {
            self.connections.load(Ordering::SeqCst)
        }
    }

    pub fn json_response(status: u16, body: &str) -> String {
        format!(
            "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    pub fn redirect_response(location: &str) -> String {
        format!(
            "HTTP/1.1 302 Found\r\nLocation: {location}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
        )
    }

    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .filter_map(|l| l.split_once(':'))
                    .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Serve each response in order, one per connection, after `delay`.
    pub async fn serve(responses: Vec<String>, delay: Duration) -> TestHttp {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let connections = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&connections);
        tokio::spawn(async move {
            for response in responses {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let tx = tx.clone();
                tokio::spawn(async move {
                    let request = read_request(&mut stream).await;
                    let _ = tx.send(request);
                    tokio::time::sleep(delay).await;
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });
        TestHttp {
            addr,
            requests: rx,
            connections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::credentials::{Anonymous, CookieCredentials};

    fn transport(base: &str, timeout: Duration) -> Transport {
        Transport::new(
            base,
            Arc::new(CookieCredentials::new("sessionid=s; csrftoken=tok")),
            timeout,
        )
        .expect("transport")
    }

    #[tokio::test]
    async fn sends_form_body_and_headers() {
        let mut server = serve(vec![json_response(200, r#"{"ok":true}"#)], Duration::ZERO).await;
        let t = transport(&server.base_url(), DEFAULT_TIMEOUT);
        let mut params = BTreeMap::new();
        params.insert("motivo".to_string(), "falta grave".to_string());

        let reply = t.post_form("/citaciones/3/aprobar/", &params).await.expect("reply");
        assert_eq!(
            reply,
            Reply::Body {
                status: 200,
                body: br#"{"ok":true}"#.to_vec()
            }
        );

        let request = server.requests.recv().await.expect("request");
        let lower = request.to_ascii_lowercase();
        assert!(request.starts_with("POST /citaciones/3/aprobar/ HTTP/1.1"));
        assert!(lower.contains("x-csrftoken: tok"));
        assert!(lower.contains("x-requested-with: xmlhttprequest"));
        assert!(lower.contains("application/x-www-form-urlencoded"));
        assert!(request.ends_with("motivo=falta+grave"));
    }

    #[tokio::test]
    async fn redirect_is_not_followed() {
        let server = serve(vec![redirect_response("/citaciones/pendientes/")], Duration::ZERO).await;
        let t = transport(&server.base_url(), DEFAULT_TIMEOUT);
        let reply = t.post_form("/citaciones/1/rechazar/", &BTreeMap::new()).await.expect("reply");
        assert_eq!(
            reply,
            Reply::Redirect {
                status: 302,
                location: Some("/citaciones/pendientes/".into())
            }
        );
        assert_eq!(server.connection_count(), 1);
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let server = serve(vec![json_response(200, "{}")], Duration::from_secs(5)).await;
        let t = transport(&server.base_url(), Duration::from_millis(100));
        let err = t.post_form("/x/", &BTreeMap::new()).await.expect_err("timeout");
        assert!(err.is_timeout(), "got {err:?}");
    }

    #[tokio::test]
    async fn refused_connection_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let t = Transport::new(&format!("http://{addr}"), Arc::new(Anonymous), DEFAULT_TIMEOUT)
            .expect("transport");
        let err = t.post_form("/x/", &BTreeMap::new()).await.expect_err("refused");
        assert!(matches!(err, ActionError::Network(_)), "got {err:?}");
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(Transport::new("not a url", Arc::new(Anonymous), DEFAULT_TIMEOUT).is_err());
    }
}
