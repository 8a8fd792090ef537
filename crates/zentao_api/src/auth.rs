//! Wire types for the `POST /tokens` login exchange.

use serde::{Deserialize, Serialize};

use crate::config::Credentials;

pub const TOKENS_PATH: &str = "tokens";

#[derive(Debug, Serialize)]
pub struct TokenRequest<'a> {
    pub account: &'a str,
    pub password: &'a str,
}

impl<'a> From<&'a Credentials> for TokenRequest<'a> {
    fn from(credentials: &'a Credentials) -> Self {
        Self {
            account: credentials.username.trim(),
            password: &credentials.password,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TokenResponse {
    #[serde(default)]
    pub token: Option<String>,
}

impl TokenResponse {
    /// Returns the issued token unless the tracker answered without one.
    pub fn into_token(self) -> Option<String> {
        self.token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }
}
