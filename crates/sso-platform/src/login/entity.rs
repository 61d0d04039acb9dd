//! Pending Login Entity
//!
//! One in-flight authorization attempt. Created by the login initiation
//! step, validated and finalized by the callback.

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Pending login for the authorization code flow
///
/// The state token doubles as the MongoDB `_id` and as the value of the
/// state cookie, which binds the callback to the browser that started it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingLogin {
    /// Opaque, unguessable state token (primary key and CSRF binding)
    #[serde(rename = "_id")]
    pub token: String,

    /// User-Agent recorded when the attempt was created
    pub user_agent: String,

    /// Where the original caller wants the one-time code delivered
    pub redirect_uri: String,

    /// Caller-supplied state, echoed back untouched
    pub state: String,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    /// Roster CID, set at finalization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<i64>,

    /// One-time login code, set at finalization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl PendingLogin {
    pub fn new(
        token: impl Into<String>,
        user_agent: impl Into<String>,
        redirect_uri: impl Into<String>,
        state: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            user_agent: user_agent.into(),
            redirect_uri: redirect_uri.into(),
            state: state.into(),
            created_at: Utc::now(),
            cid: None,
            code: None,
        }
    }

    /// Override the creation time
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Whether the attempt is still inside the validity window at `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.created_at > now - window
    }

    /// A finalized login has already produced its one-time code
    pub fn is_finalized(&self) -> bool {
        self.code.is_some()
    }

    /// The request must come from the browser that started the login
    pub fn matches_user_agent(&self, user_agent: &str) -> bool {
        self.user_agent == user_agent
    }

    /// Link the confirmed roster user and attach the one-time code
    pub fn finalize(&mut self, cid: i64, code: String) {
        self.cid = Some(cid);
        self.code = Some(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_login() {
        let login = PendingLogin::new(
            "state-token",
            "Mozilla/5.0",
            "https://app.example.com/login",
            "caller-state",
        );

        assert_eq!(login.token, "state-token");
        assert_eq!(login.redirect_uri, "https://app.example.com/login");
        assert_eq!(login.state, "caller-state");
        assert!(!login.is_finalized());
        assert!(login.cid.is_none());
    }

    #[test]
    fn test_validity_window() {
        let now = Utc::now();
        let window = Duration::minutes(5);

        let fresh = PendingLogin::new("t", "ua", "r", "s").with_created_at(now - Duration::minutes(4));
        assert!(fresh.is_valid_at(now, window));

        let stale = PendingLogin::new("t", "ua", "r", "s").with_created_at(now - Duration::minutes(6));
        assert!(!stale.is_valid_at(now, window));
    }

    #[test]
    fn test_user_agent_is_exact() {
        let login = PendingLogin::new("t", "Mozilla/5.0", "r", "s");
        assert!(login.matches_user_agent("Mozilla/5.0"));
        assert!(!login.matches_user_agent("mozilla/5.0"));
        assert!(!login.matches_user_agent("Mozilla/5.0 "));
    }

    #[test]
    fn test_finalize() {
        let mut login = PendingLogin::new("t", "ua", "r", "s");
        login.finalize(1234567, "abc".to_string());

        assert!(login.is_finalized());
        assert_eq!(login.cid, Some(1234567));
        assert_eq!(login.code.as_deref(), Some("abc"));
    }

    #[test]
    fn test_bson_shape() {
        let login = PendingLogin::new("tok", "ua", "https://r", "s");
        let doc = bson::to_document(&login).unwrap();

        assert_eq!(doc.get_str("_id").unwrap(), "tok");
        assert_eq!(doc.get_str("userAgent").unwrap(), "ua");
        assert_eq!(doc.get_str("redirectUri").unwrap(), "https://r");
        assert!(doc.get_datetime("createdAt").is_ok());
        assert!(!doc.contains_key("code"));
    }
}
