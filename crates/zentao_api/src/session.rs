//! Token lifecycle for the single ZenTao account this process works with.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use reqwest::Method;
use tracing::{debug, info, warn};

use crate::auth::{TokenRequest, TokenResponse, TOKENS_PATH};
use crate::config::Credentials;
use crate::error::{Result, ZentaoError};
use crate::gateway::HttpGateway;

/// Durable home for the session token; written before a new token is used.
pub trait TokenStore: Send + Sync {
    fn persist_token(&self, token: &str) -> Result<()>;
}

/// Keeps persisted tokens in memory. Useful for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<Vec<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every token persisted so far, oldest first.
    pub fn persisted(&self) -> Vec<String> {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TokenStore for MemoryTokenStore {
    fn persist_token(&self, token: &str) -> Result<()> {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(token.to_string());
        Ok(())
    }
}

/// Snapshot of the authenticated session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub realname: Option<String>,
}

/// Owns the token: acquires it with the configured credentials, hands it to the gateway and replaces it when the tracker rejects it.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    credentials: Credentials,
    state: Mutex<Session>,
    store: Arc<dyn TokenStore>,
}

impl SessionManager {
    pub fn new(credentials: Credentials, store: Arc<dyn TokenStore>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                credentials,
                state: Mutex::new(Session::default()),
                store,
            }),
        }
    }

    /// Adopts a token restored from durable storage without writing it back.
    pub fn with_restored_token(self, token: Option<String>) -> Self {
        self.state().token = token.filter(|value| !value.trim().is_empty());
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.inner.credentials
    }

    pub fn get_token(&self) -> Option<String> {
        self.state().token.clone()
    }

    /// Persists the token, then makes it current. A failed write leaves the old token in place.
    pub fn set_token(&self, token: &str) -> Result<()> {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(ZentaoError::precondition("token must not be empty"));
        }
        self.inner.store.persist_token(trimmed)?;
        self.state().token = Some(trimmed.to_string());
        Ok(())
    }

    /// Drops the in-memory token so the next call logs in again.
    pub fn forget_token(&self) {
        self.state().token = None;
    }

    pub fn realname(&self) -> Option<String> {
        self.state().realname.clone()
    }

    pub fn set_realname(&self, realname: impl Into<String>) {
        self.state().realname = Some(realname.into());
    }

    pub fn snapshot(&self) -> Session {
        self.state().clone()
    }

    /// Returns the cached token, logging in first when there is none.
    pub async fn ensure_token(&self, gateway: &HttpGateway) -> Result<String> {
        if let Some(token) = self.get_token() {
            return Ok(token);
        }
        debug!("No cached token, logging in");
        self.reauthenticate(gateway).await
    }

    /// Exchanges the credentials for a fresh token and persists it.
    pub async fn reauthenticate(&self, gateway: &HttpGateway) -> Result<String> {
        let credentials = &self.inner.credentials;
        if let Some(field) = credentials.missing_field() {
            return Err(ZentaoError::precondition(format!("missing credentials: {field}")));
        }

        info!(account = %credentials.username.trim(), "Requesting ZenTao token");
        let request = TokenRequest::from(credentials);
        let response = gateway
            .send(Method::POST, TOKENS_PATH, Some(&request), None)
            .await
            .map_err(|err| match err {
                ZentaoError::Http { status, message, .. } => {
                    warn!(%status, "Login rejected");
                    ZentaoError::Authentication(format!("login rejected ({status}): {message}"))
                }
                other => other,
            })?;

        let token = response
            .decode::<TokenResponse>()?
            .into_token()
            .ok_or_else(|| {
                warn!("Login response carried no token");
                ZentaoError::Authentication("token missing from login response".into())
            })?;

        self.set_token(&token)?;
        info!("Token obtained");
        Ok(token)
    }

    fn state(&self) -> MutexGuard<'_, Session> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
