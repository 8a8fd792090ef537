use serde::{Deserialize, Serialize};

use super::lenient;

/// Represents one defect snapshot from a product's bug list.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bug {
    #[serde(deserialize_with = "lenient::required_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<BugAssignee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub severity: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub pri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opened_date: Option<String>,
}

impl Bug {
    pub fn assignee_realname(&self) -> Option<&str> {
        self.assigned_to.as_ref().and_then(BugAssignee::realname)
    }
}

/// `assignedTo` is an object for assigned bugs and a bare account string otherwise.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum BugAssignee {
    Object(AssigneePayload),
    Text(String),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct AssigneePayload {
    #[serde(
        default,
        deserialize_with = "lenient::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realname: Option<String>,
}

impl BugAssignee {
    pub fn realname(&self) -> Option<&str> {
        match self {
            BugAssignee::Object(payload) => payload.realname.as_deref(),
            BugAssignee::Text(_) => None,
        }
    }

    pub fn account(&self) -> Option<&str> {
        match self {
            BugAssignee::Object(payload) => payload.account.as_deref(),
            BugAssignee::Text(value) if !value.trim().is_empty() => Some(value.trim()),
            BugAssignee::Text(_) => None,
        }
    }
}

/// Envelope of `GET /products/{id}/bugs`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct BugList {
    #[serde(default)]
    pub bugs: Vec<Bug>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub limit: Option<u64>,
}
