//! User profile models returned by the ZenTao identity endpoint.

use serde::{Deserialize, Serialize};

use super::lenient;

/// Envelope of `GET /user`.
#[derive(Debug, Deserialize, Clone)]
pub struct UserResponse {
    #[serde(default)]
    pub profile: UserProfile,
}

#[derive(Debug, Default, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
/// Represents the authenticated user's profile: account, display name, role and email.
pub struct UserProfile {
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub id: Option<String>,
    pub account: Option<String>,
    pub realname: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
}

impl UserProfile {
    /// Returns the display name used to match bug assignees, if the tracker sent one.
    pub fn display_name(&self) -> Option<&str> {
        self.realname
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}
