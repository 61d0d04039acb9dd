//! Identity Provider
//!
//! The outbound half of the authorization code flow: trade the code for an
//! access token, then read the caller's identity with that token.

pub mod client;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

pub use client::IdentityProviderClient;

/// Failures talking to the identity provider
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Request to {endpoint} failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} endpoint returned {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    #[error("Failed to decode {endpoint} response: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("Token endpoint returned no access token")]
    EmptyToken,
}

/// Bearer token returned by the token endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Identity as reported by the provider's user-info endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub cid: i64,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserResponse {
    pub data: UserData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserData {
    pub cid: i64,
    #[serde(default)]
    pub personal: PersonalDetails,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PersonalDetails {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl UserData {
    pub(crate) fn into_identity(self) -> ExternalIdentity {
        let personal = self.personal;
        ExternalIdentity {
            cid: self.cid,
            first_name: personal.first_name.unwrap_or_default(),
            last_name: personal.last_name.unwrap_or_default(),
            full_name: personal.full_name.unwrap_or_default(),
        }
    }
}

/// Endpoint and client credentials for the identity provider
#[derive(Clone)]
pub struct ProviderSettings {
    pub base_url: String,
    pub token_path: String,
    pub user_path: String,
    pub client_id: String,
    pub client_secret: String,
    pub request_timeout: std::time::Duration,
}

impl ProviderSettings {
    pub fn token_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.token_path)
    }

    pub fn user_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.user_path)
    }
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("token_url", &self.token_url())
            .field("user_url", &self.user_url())
            .field("client_id", &self.client_id)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

/// Outbound calls the callback needs from an identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Trade an authorization code for an access token
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<AccessToken, ProviderError>;

    /// Read the identity behind an access token
    async fn fetch_profile(&self, token: &AccessToken) -> Result<ExternalIdentity, ProviderError>;

    /// Token exchange followed by the profile fetch
    async fn resolve_identity(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<ExternalIdentity, ProviderError> {
        let token = self.exchange_code(code, redirect_uri).await?;
        self.fetch_profile(&token).await
    }
}
