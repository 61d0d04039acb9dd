//! Roster user

use serde::{Deserialize, Serialize};

/// A user who is allowed to log in. Keyed by CID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterUser {
    #[serde(rename = "_id")]
    pub cid: i64,

    #[serde(default)]
    pub first_name: String,

    #[serde(default)]
    pub last_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl RosterUser {
    pub fn new(cid: i64, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            cid,
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: None,
        }
    }
}
