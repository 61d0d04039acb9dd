//! HTTP client for the identity provider

use async_trait::async_trait;
use reqwest::header;
use tracing::{debug, warn};

use super::{
    AccessToken, ExternalIdentity, IdentityProvider, ProviderError, ProviderSettings,
    TokenResponse, UserResponse,
};

const TOKEN_ENDPOINT: &str = "token";
const USER_ENDPOINT: &str = "user";

/// reqwest-backed [`IdentityProvider`]. No retries.
#[derive(Clone, Debug)]
pub struct IdentityProviderClient {
    http: reqwest::Client,
    settings: ProviderSettings,
}

impl IdentityProviderClient {
    pub fn new(settings: ProviderSettings) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self { http, settings })
    }
}

async fn check_status(
    endpoint: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    warn!(endpoint, status, "Identity provider returned an error status");
    Err(ProviderError::Status {
        endpoint,
        status,
        body,
    })
}

#[async_trait]
impl IdentityProvider for IdentityProviderClient {
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<AccessToken, ProviderError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
        ];

        debug!(redirect_uri, "Exchanging authorization code");

        let response = self
            .http
            .post(self.settings.token_url())
            .header(header::ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                endpoint: TOKEN_ENDPOINT,
                source,
            })?;

        let token: TokenResponse = check_status(TOKEN_ENDPOINT, response)
            .await?
            .json()
            .await
            .map_err(|source| ProviderError::Decode {
                endpoint: TOKEN_ENDPOINT,
                source,
            })?;

        match token.access_token {
            Some(token) if !token.is_empty() => Ok(AccessToken::new(token)),
            _ => Err(ProviderError::EmptyToken),
        }
    }

    async fn fetch_profile(&self, token: &AccessToken) -> Result<ExternalIdentity, ProviderError> {
        let response = self
            .http
            .get(self.settings.user_url())
            .header(header::ACCEPT, "application/json")
            .bearer_auth(token.secret())
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                endpoint: USER_ENDPOINT,
                source,
            })?;

        let user: UserResponse = check_status(USER_ENDPOINT, response)
            .await?
            .json()
            .await
            .map_err(|source| ProviderError::Decode {
                endpoint: USER_ENDPOINT,
                source,
            })?;

        debug!(cid = user.data.cid, "Fetched identity from provider");
        Ok(user.data.into_identity())
    }
}
