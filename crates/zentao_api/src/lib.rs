//! Typed ZenTao API client crate: session handling, resilient requests and
//! the "bugs assigned to me" filter used by the bug fetcher.

pub mod auth;
pub mod backoff;
pub mod bugs;
pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod session;

pub use backoff::RetryPolicy;
pub use bugs::filter_assigned_to;
pub use client::ZentaoClient;
pub use config::{Credentials, ZentaoConfig};
pub use error::{ErrorKind, Result, ZentaoError};
pub use gateway::{ApiResponse, HttpGateway, TokenMode};
pub use models::{AssigneePayload, Bug, BugAssignee, BugList, Product, ProductList, UserProfile};
pub use session::{MemoryTokenStore, Session, SessionManager, TokenStore};
