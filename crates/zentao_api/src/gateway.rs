//! Authenticated HTTP layer: token injection, transient-failure retries and
//! transparent re-authentication when the tracker rejects a token.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client as HttpClient, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::config::{ZentaoConfig, TOKEN_HEADER};
use crate::error::{Result, ZentaoError};
use crate::session::SessionManager;

/// Whether a call carries the session token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenMode {
    Inject,
    /// Only for the login call itself.
    Suppress,
}

/// Decoded body of a 200/201 response.
#[derive(Clone, Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub payload: Value,
}

impl ApiResponse {
    pub fn decode<T>(self) -> Result<T>
    where
        T: DeserializeOwned,
    {
        serde_json::from_value(self.payload).map_err(ZentaoError::from)
    }
}

#[derive(Clone)]
pub struct HttpGateway {
    http: HttpClient,
    config: ZentaoConfig,
}

impl HttpGateway {
    pub fn new(config: ZentaoConfig) -> Result<Self> {
        let http = build_http_client(&config)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ZentaoConfig {
        &self.config
    }

    /// Issues a call against the API root.
    ///
    /// A 401 on a call that carried a token triggers exactly one
    /// re-authentication through `session` and one replay of the call with
    /// the new token. Any further rejection surfaces as
    /// [`ZentaoError::Authentication`].
    pub async fn call<B>(
        &self,
        session: &SessionManager,
        method: Method,
        path: &str,
        body: Option<&B>,
        mode: TokenMode,
    ) -> Result<ApiResponse>
    where
        B: Serialize + ?Sized,
    {
        let token = match mode {
            TokenMode::Inject => session.get_token(),
            TokenMode::Suppress => None,
        };

        let first = self.send(method.clone(), path, body, token.as_deref()).await;
        match first {
            Err(err) if is_unauthorized(&err) && token.is_some() => {
                warn!(%method, path, "Token rejected, re-authenticating");
                let fresh = match session.reauthenticate(self).await {
                    Ok(fresh) => fresh,
                    Err(reauth_err) => {
                        error!(error = %reauth_err, "Re-authentication failed");
                        return Err(ZentaoError::Authentication(format!(
                            "{err}; re-authentication failed: {reauth_err}"
                        )));
                    }
                };
                self.send(method, path, body, Some(&fresh))
                    .await
                    .map_err(|retry_err| {
                        if is_unauthorized(&retry_err) {
                            ZentaoError::Authentication(format!(
                                "token rejected after re-authentication: {retry_err}"
                            ))
                        } else {
                            retry_err
                        }
                    })
            }
            Err(err) if is_unauthorized(&err) => Err(ZentaoError::Authentication(err.to_string())),
            other => other,
        }
    }

    /// Sends with an explicit token (or none), retrying transient failures per
    /// the configured [`RetryPolicy`](crate::backoff::RetryPolicy). Statuses
    /// other than 200/201 come back as [`ZentaoError::Http`] and are never retried.
    pub async fn send<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        token: Option<&str>,
    ) -> Result<ApiResponse>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url_for(path);
        let policy = &self.config.retry;
        let mut failed = 0;

        loop {
            match self.send_once(method.clone(), &url, body, token).await {
                Err(err) if err.is_transient() => {
                    failed += 1;
                    if failed >= policy.max_attempts() {
                        error!(%method, url = %url, attempts = failed, error = %err, "Giving up after transient failures");
                        return Err(err);
                    }
                    let delay = policy.delay_after(failed);
                    warn!(
                        %method,
                        url = %url,
                        attempt = failed,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient failure, retrying"
                    );
                    sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    async fn send_once<B>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
        token: Option<&str>,
    ) -> Result<ApiResponse>
    where
        B: Serialize + ?Sized,
    {
        debug!(%method, url, with_token = token.is_some(), "API request");
        let mut request = self.http.request(method, url);
        if let Some(token) = token {
            request = request.header(TOKEN_HEADER, token);
        }
        if let Some(payload) = body {
            request = request.json(payload);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(%status, "API response");

        if status == StatusCode::OK || status == StatusCode::CREATED {
            let payload = if text.trim().is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&text)?
            };
            Ok(ApiResponse { status, payload })
        } else {
            Err(build_http_error(status, &text))
        }
    }

    fn url_for(&self, path: &str) -> String {
        let mut base = self.config.api_root();
        base.push_str(path.trim_start_matches('/'));
        base
    }
}

fn is_unauthorized(err: &ZentaoError) -> bool {
    err.status() == Some(StatusCode::UNAUTHORIZED)
}

fn build_http_client(config: &ZentaoConfig) -> Result<HttpClient> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&config.user_agent)
            .map_err(|err| ZentaoError::Other(err.to_string()))?,
    );

    HttpClient::builder()
        .default_headers(headers)
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .build()
        .map_err(|err| ZentaoError::Other(err.to_string()))
}

fn build_http_error(status: StatusCode, body: &str) -> ZentaoError {
    let code = extract_error_code(body);
    ZentaoError::http(status, code, body.to_string())
}

fn extract_error_code(body: &str) -> Option<String> {
    let value = serde_json::from_str::<Value>(body).ok()?;
    ["code", "error"].iter().find_map(|field| match value.get(*field)? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::RetryPolicy;
    use crate::config::Credentials;
    use crate::session::MemoryTokenStore;
    use mockito::Matcher;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(20), Duration::from_millis(30))
    }

    fn setup(url: &str, token: Option<&str>) -> (HttpGateway, SessionManager, Arc<MemoryTokenStore>) {
        let credentials = Credentials::new(url, "alice", "pw");
        let config = ZentaoConfig::new(credentials.clone()).with_retry(fast_retry());
        let store = Arc::new(MemoryTokenStore::new());
        let session = SessionManager::new(credentials, store.clone())
            .with_restored_token(token.map(str::to_string));
        (HttpGateway::new(config).unwrap(), session, store)
    }

    /// Accepts connections, reads the request, and hangs up without answering.
    async fn hang_up_server() -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = accepted.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
            }
        });
        (format!("http://{addr}"), accepted)
    }

    #[tokio::test]
    async fn injects_token_and_decodes_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api.php/v1/user")
            .match_header("token", "abc123")
            .with_status(200)
            .with_body(r#"{"profile":{"realname":"Alice"}}"#)
            .create_async()
            .await;

        let (gateway, session, _) = setup(&server.url(), Some("abc123"));
        let response = gateway
            .call(&session, Method::GET, "user", None::<&Value>, TokenMode::Inject)
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.payload["profile"]["realname"], "Alice");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn suppressed_call_never_sends_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api.php/v1/tokens")
            .match_header("token", Matcher::Missing)
            .with_status(201)
            .with_body(r#"{"token":"t"}"#)
            .create_async()
            .await;

        let (gateway, session, _) = setup(&server.url(), Some("cached"));
        gateway
            .call(
                &session,
                Method::POST,
                "tokens",
                Some(&serde_json::json!({"account": "alice"})),
                TokenMode::Suppress,
            )
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_once_and_call_replayed() {
        let mut server = mockito::Server::new_async().await;
        let stale = server
            .mock("GET", "/api.php/v1/products")
            .match_header("token", "stale")
            .with_status(401)
            .with_body(r#"{"error":"Unauthorized"}"#)
            .expect(1)
            .create_async()
            .await;
        let login = server
            .mock("POST", "/api.php/v1/tokens")
            .match_header("token", Matcher::Missing)
            .with_status(201)
            .with_body(r#"{"token":"fresh"}"#)
            .expect(1)
            .create_async()
            .await;
        let fresh = server
            .mock("GET", "/api.php/v1/products")
            .match_header("token", "fresh")
            .with_status(200)
            .with_body(r#"{"products":[]}"#)
            .expect(1)
            .create_async()
            .await;

        let (gateway, session, store) = setup(&server.url(), Some("stale"));
        let response = gateway
            .call(&session, Method::GET, "products", None::<&Value>, TokenMode::Inject)
            .await
            .unwrap();

        assert_eq!(response.payload["products"], serde_json::json!([]));
        assert_eq!(session.get_token().as_deref(), Some("fresh"));
        assert_eq!(store.persisted(), vec!["fresh".to_string()]);
        stale.assert_async().await;
        login.assert_async().await;
        fresh.assert_async().await;
    }

    #[tokio::test]
    async fn failed_reauthentication_surfaces_auth_error_without_looping() {
        let mut server = mockito::Server::new_async().await;
        let rejected = server
            .mock("GET", "/api.php/v1/user")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;
        let login = server
            .mock("POST", "/api.php/v1/tokens")
            .with_status(401)
            .with_body(r#"{"error":"bad credentials"}"#)
            .expect(1)
            .create_async()
            .await;

        let (gateway, session, store) = setup(&server.url(), Some("stale"));
        let err = gateway
            .call(&session, Method::GET, "user", None::<&Value>, TokenMode::Inject)
            .await
            .unwrap_err();

        assert!(matches!(err, ZentaoError::Authentication(_)), "{err:?}");
        assert_eq!(session.get_token().as_deref(), Some("stale"));
        assert!(store.persisted().is_empty());
        rejected.assert_async().await;
        login.assert_async().await;
    }

    #[tokio::test]
    async fn rejection_after_refresh_is_not_retried_again() {
        let mut server = mockito::Server::new_async().await;
        let rejected = server
            .mock("GET", "/api.php/v1/user")
            .with_status(401)
            .expect(2)
            .create_async()
            .await;
        let login = server
            .mock("POST", "/api.php/v1/tokens")
            .with_status(201)
            .with_body(r#"{"token":"fresh"}"#)
            .expect(1)
            .create_async()
            .await;

        let (gateway, session, _) = setup(&server.url(), Some("stale"));
        let err = gateway
            .call(&session, Method::GET, "user", None::<&Value>, TokenMode::Inject)
            .await
            .unwrap_err();

        assert!(matches!(err, ZentaoError::Authentication(_)));
        rejected.assert_async().await;
        login.assert_async().await;
    }

    #[tokio::test]
    async fn unauthorized_without_token_skips_reauthentication() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api.php/v1/user")
            .with_status(401)
            .create_async()
            .await;
        let login = server
            .mock("POST", "/api.php/v1/tokens")
            .expect(0)
            .create_async()
            .await;

        let (gateway, session, _) = setup(&server.url(), None);
        let err = gateway
            .call(&session, Method::GET, "user", None::<&Value>, TokenMode::Inject)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), crate::error::ErrorKind::Auth);
        login.assert_async().await;
    }

    #[tokio::test]
    async fn other_statuses_surface_code_and_body_without_retry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api.php/v1/products/9/bugs")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"error":"product not found"}"#)
            .expect(1)
            .create_async()
            .await;

        let (gateway, session, _) = setup(&server.url(), Some("abc"));
        let err = gateway
            .call(
                &session,
                Method::GET,
                "products/9/bugs?limit=1000",
                None::<&Value>,
                TokenMode::Inject,
            )
            .await
            .unwrap_err();

        match err {
            ZentaoError::Http { status, code, message } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(code.as_deref(), Some("product not found"));
                assert!(message.contains("product not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn network_failures_stop_after_three_attempts() {
        let (url, accepted) = hang_up_server().await;
        let (gateway, session, _) = setup(&url, Some("abc"));

        let start = Instant::now();
        let err = gateway
            .call(&session, Method::GET, "user", None::<&Value>, TokenMode::Inject)
            .await
            .unwrap_err();

        assert!(err.is_transient(), "{err:?}");
        assert_eq!(accepted.load(Ordering::SeqCst), 3);
        // waits of 20ms then 30ms (capped) between the attempts
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn attempt_timeout_counts_as_network_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let credentials = Credentials::new(format!("http://{addr}"), "alice", "pw");
        let config = ZentaoConfig::new(credentials.clone())
            .with_timeout(Duration::from_millis(100))
            .with_retry(RetryPolicy::new(2, Duration::from_millis(10), Duration::from_millis(10)));
        let gateway = HttpGateway::new(config).unwrap();
        let session = SessionManager::new(credentials, Arc::new(MemoryTokenStore::new()));

        let err = gateway
            .call(&session, Method::GET, "user", None::<&Value>, TokenMode::Inject)
            .await
            .unwrap_err();
        assert!(matches!(err, ZentaoError::Timeout(_)), "{err:?}");
        assert_eq!(err.kind(), crate::error::ErrorKind::Network);
    }

    #[test]
    fn error_code_is_read_from_code_or_error_field() {
        assert_eq!(extract_error_code(r#"{"code": 42}"#).as_deref(), Some("42"));
        assert_eq!(extract_error_code(r#"{"error": "nope"}"#).as_deref(), Some("nope"));
        assert_eq!(extract_error_code("plain text"), None);
    }
}
