//! Error model used by ZenTao API client operations.

use std::io;

use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ZentaoError>;

/// Coarse classification surfaced to front-ends alongside the message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Auth,
    Precondition,
    Upstream,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Auth => "auth",
            ErrorKind::Precondition => "precondition",
            ErrorKind::Upstream => "upstream",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Represents the error conditions of a ZenTao API interaction: non-success HTTP statuses, authentication failures, transport failures, caller-fixable preconditions and decode problems.
#[derive(Debug, Error)]
pub enum ZentaoError {
    #[error("http {status}: {message}")]
    Http {
        status: StatusCode,
        code: Option<String>,
        message: String,
    },
    #[error("authentication error: {0}")]
    Authentication(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("precondition failed: {0}")]
    Precondition(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("unexpected error: {0}")]
    Other(String),
}

impl ZentaoError {
    /// Constructs an HTTP error variant with optional API-specific code.
    pub fn http(status: StatusCode, code: Option<String>, message: impl Into<String>) -> Self {
        ZentaoError::Http {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        ZentaoError::Precondition(message.into())
    }

    /// True for transport-level failures that the gateway retries with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, ZentaoError::Timeout(_) | ZentaoError::Network(_))
    }

    /// Returns the HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ZentaoError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ZentaoError::Http { .. } => ErrorKind::Upstream,
            ZentaoError::Authentication(_) => ErrorKind::Auth,
            ZentaoError::Timeout(_) | ZentaoError::Network(_) => ErrorKind::Network,
            ZentaoError::Precondition(_) => ErrorKind::Precondition,
            ZentaoError::Serialization(_) | ZentaoError::Io(_) | ZentaoError::Other(_) => {
                ErrorKind::Internal
            }
        }
    }
}

impl From<reqwest::Error> for ZentaoError {
    /// Converts reqwest errors into semantic ZentaoError variants.
    ///
    /// Anything raised while sending or reading a response is a transport
    /// failure; only builder and decode errors fall outside that.
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ZentaoError::Timeout(err.to_string())
        } else if err.is_status() {
            let status = err.status().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            ZentaoError::Http {
                status,
                code: None,
                message: err.to_string(),
            }
        } else if err.is_decode() {
            ZentaoError::Serialization(err.to_string())
        } else if err.is_builder() {
            ZentaoError::Other(err.to_string())
        } else {
            ZentaoError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ZentaoError {
    /// Converts serde_json decode/encode failures into serialization errors.
    fn from(err: serde_json::Error) -> Self {
        ZentaoError::Serialization(err.to_string())
    }
}
