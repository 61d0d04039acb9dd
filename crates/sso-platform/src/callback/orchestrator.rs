//! Callback Orchestrator
//!
//! Validates the request-bound state, runs the provider exchange, checks the
//! roster and finalizes the pending login. Produces either the redirect back
//! to the original caller or a terminal [`CallbackError`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::callback::error::CallbackError;
use crate::login::{generate_login_code, CleanupQueue, PendingLoginRepository};
use crate::provider::IdentityProvider;
use crate::roster::RosterLookup;

/// Tunables for the callback flow
#[derive(Debug, Clone)]
pub struct CallbackSettings {
    /// How long a pending login stays valid after creation
    pub validity_window: Duration,
    /// Deadline for the whole provider round trip
    pub exchange_timeout: Duration,
    /// Scheme for the callback URL derived from the request host
    pub callback_scheme: String,
    pub callback_path: String,
    /// Fixed external base URL; wins over the request host when set
    pub external_base_url: Option<String>,
}

impl Default for CallbackSettings {
    fn default() -> Self {
        Self {
            validity_window: Duration::from_secs(300),
            exchange_timeout: Duration::from_secs(10),
            callback_scheme: "https".to_string(),
            callback_path: "/oauth/callback".to_string(),
            external_base_url: None,
        }
    }
}

impl CallbackSettings {
    /// The callback URL sent to the provider as `redirect_uri`
    pub fn callback_url(&self, host: Option<&str>) -> Result<String, CallbackError> {
        if let Some(base) = self.external_base_url.as_deref() {
            return Ok(format!("{}{}", base.trim_end_matches('/'), self.callback_path));
        }

        match host.map(str::trim).filter(|h| !h.is_empty()) {
            Some(host) => Ok(format!(
                "{}://{}{}",
                self.callback_scheme, host, self.callback_path
            )),
            None => Err(CallbackError::invalid_request(
                "no request host and no external base URL configured",
            )),
        }
    }
}

/// Inputs of one callback request, already pulled out of HTTP
#[derive(Debug, Clone, Default)]
pub struct CallbackRequest {
    pub code: Option<String>,
    /// Value of the state cookie
    pub state_token: Option<String>,
    pub user_agent: String,
    pub host: Option<String>,
    /// `error` query parameter sent by the provider
    pub provider_error: Option<String>,
    pub provider_error_description: Option<String>,
}

/// Where to send the browser after a successful callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    pub location: String,
}

impl RedirectTarget {
    /// Append `code` and `state` to the caller's redirect URI.
    ///
    /// Both values are percent-encoded as opaque strings, so a `state` the
    /// caller already URL-encoded arrives encoded twice and decodes back to
    /// exactly what was stored.
    pub fn new(redirect_uri: &str, code: &str, state: &str) -> Self {
        let separator = if redirect_uri.contains('?') { '&' } else { '?' };
        Self {
            location: format!(
                "{}{}code={}&state={}",
                redirect_uri,
                separator,
                urlencoding::encode(code),
                urlencoding::encode(state)
            ),
        }
    }
}

/// The callback state machine
pub struct CallbackOrchestrator {
    logins: Arc<dyn PendingLoginRepository>,
    roster: Arc<dyn RosterLookup>,
    provider: Arc<dyn IdentityProvider>,
    cleanup: CleanupQueue,
    settings: CallbackSettings,
}

impl CallbackOrchestrator {
    pub fn new(
        logins: Arc<dyn PendingLoginRepository>,
        roster: Arc<dyn RosterLookup>,
        provider: Arc<dyn IdentityProvider>,
        cleanup: CleanupQueue,
        settings: CallbackSettings,
    ) -> Self {
        Self {
            logins,
            roster,
            provider,
            cleanup,
            settings,
        }
    }

    /// Handle one callback. Errors are logged here with their detail.
    pub async fn handle_callback(
        &self,
        request: CallbackRequest,
    ) -> Result<RedirectTarget, CallbackError> {
        let result = self.process(request).await;

        if let Err(e) = &result {
            match e {
                CallbackError::InternalFailure { .. } => {
                    error!(kind = e.kind(), detail = e.detail(), "Login callback failed")
                }
                _ => warn!(kind = e.kind(), detail = e.detail(), "Login callback rejected"),
            }
        }

        result
    }

    async fn process(&self, request: CallbackRequest) -> Result<RedirectTarget, CallbackError> {
        if let Some(provider_error) = request.provider_error.as_deref() {
            return Err(CallbackError::invalid_request(format!(
                "provider returned error '{}': {}",
                provider_error,
                request.provider_error_description.as_deref().unwrap_or("no description")
            )));
        }

        let code = request
            .code
            .filter(|c| !c.is_empty())
            .ok_or_else(|| CallbackError::invalid_request("missing authorization code"))?;
        let token = request
            .state_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CallbackError::invalid_request("missing state cookie"))?;
        let callback_url = self.settings.callback_url(request.host.as_deref())?;

        // State lookup, restricted to the validity window
        let window = chrono::Duration::from_std(self.settings.validity_window)
            .map_err(|e| CallbackError::internal(format!("validity window out of range: {}", e)))?;
        let now = Utc::now();
        let mut login = self
            .logins
            .find_pending(&token, now - window)
            .await
            .map_err(|e| CallbackError::internal(format!("pending login lookup failed: {}", e)))?
            .filter(|login| login.is_valid_at(now, window))
            .ok_or_else(|| CallbackError::invalid_token("pending login not found or expired"))?;

        if login.is_finalized() {
            return Err(CallbackError::invalid_token("pending login already used"));
        }

        if !login.matches_user_agent(&request.user_agent) {
            self.cleanup.schedule(login);
            return Err(CallbackError::invalid_token("user agent does not match pending login"));
        }

        // Provider round trip runs detached so it can be cut off at the deadline
        let provider = Arc::clone(&self.provider);
        let mut exchange =
            tokio::spawn(async move { provider.resolve_identity(&code, &callback_url).await });

        let identity = match timeout(self.settings.exchange_timeout, &mut exchange).await {
            Err(_) => {
                exchange.abort();
                return Err(CallbackError::upstream_timeout(format!(
                    "provider exchange exceeded {:?}",
                    self.settings.exchange_timeout
                )));
            }
            Ok(Err(join_error)) => {
                return Err(CallbackError::upstream(format!(
                    "provider exchange task failed: {}",
                    join_error
                )));
            }
            Ok(Ok(Err(provider_error))) => {
                return Err(CallbackError::upstream(provider_error.to_string()));
            }
            Ok(Ok(Ok(identity))) => identity,
        };
        debug!(cid = identity.cid, "Provider identity resolved");

        let user = self
            .roster
            .lookup(identity.cid)
            .await
            .map_err(|e| CallbackError::internal(format!("roster lookup failed: {}", e)))?
            .ok_or_else(|| {
                CallbackError::not_authorized(format!("cid {} is not on the roster", identity.cid))
            })?;

        let one_time_code = generate_login_code()
            .map_err(|e| CallbackError::internal(format!("login code generation failed: {}", e)))?;
        login.finalize(user.cid, one_time_code.clone());

        let saved = self
            .logins
            .save_progress(&login)
            .await
            .map_err(|e| CallbackError::internal(format!("saving pending login failed: {}", e)))?;
        if !saved {
            return Err(CallbackError::invalid_token(
                "pending login was consumed by a concurrent callback",
            ));
        }

        info!(cid = user.cid, "Login callback completed");
        Ok(RedirectTarget::new(&login.redirect_uri, &one_time_code, &login.state))
    }
}
