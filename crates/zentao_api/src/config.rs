use std::fmt;
use std::time::Duration;

use crate::backoff::RetryPolicy;

pub const DEFAULT_API_PATH: &str = "api.php/v1";
pub const DEFAULT_USER_AGENT: &str = "bugfetcher";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_BUG_PAGE_LIMIT: u32 = 1000;
pub const TOKEN_HEADER: &str = "Token";

/// Login credentials for one ZenTao account.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub server_url: String,
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(
        server_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Names the first blank field, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.server_url.trim().is_empty() {
            Some("server url")
        } else if self.username.trim().is_empty() {
            Some("username")
        } else if self.password.is_empty() {
            Some("password")
        } else {
            None
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("server_url", &self.server_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct ZentaoConfig {
    pub credentials: Credentials,
    pub api_path: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub retry: RetryPolicy,
    pub bug_page_limit: u32,
}

impl ZentaoConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            api_path: DEFAULT_API_PATH.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
            bug_page_limit: DEFAULT_BUG_PAGE_LIMIT,
        }
    }

    pub fn with_api_path(mut self, path: impl Into<String>) -> Self {
        self.api_path = path.into();
        self
    }

    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    pub fn with_timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }

    pub fn with_connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = duration;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_bug_page_limit(mut self, limit: u32) -> Self {
        self.bug_page_limit = limit;
        self
    }

    pub fn api_root(&self) -> String {
        format!(
            "{}/{}/",
            self.credentials.server_url.trim_end_matches('/'),
            self.api_path.trim_matches('/')
        )
    }
}
