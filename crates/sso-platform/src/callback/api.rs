//! OAuth Callback Endpoint
//!
//! `GET /callback` receives the identity provider's redirect. The state
//! token travels in a cookie set by the login initiation step; the response
//! is a 302 back to the original caller or an HTML error page.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::{cookie::CookieJar, Host};
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::callback::orchestrator::{CallbackOrchestrator, CallbackRequest};

/// Callback API state
#[derive(Clone)]
pub struct CallbackApiState {
    pub orchestrator: Arc<CallbackOrchestrator>,
    /// Cookie carrying the pending-login state token
    pub state_cookie_name: String,
}

impl CallbackApiState {
    pub fn new(orchestrator: Arc<CallbackOrchestrator>) -> Self {
        Self {
            orchestrator,
            state_cookie_name: "sso_token".to_string(),
        }
    }

    pub fn with_state_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.state_cookie_name = name.into();
        self
    }
}

/// Query parameters sent by the identity provider
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackParams {
    /// Authorization code
    pub code: Option<String>,
    /// Set when the user denied access or the provider failed
    pub error: Option<String>,
    pub error_description: Option<String>,
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Complete an authorization code login
#[utoipa::path(
    get,
    path = "/callback",
    tag = "oauth",
    params(CallbackParams),
    responses(
        (status = 302, description = "Login complete, redirect to the caller with a one-time code"),
        (status = 400, description = "Missing code or state cookie, or provider reported an error"),
        (status = 401, description = "State token invalid, expired, already used or bound to another browser"),
        (status = 403, description = "Identity not on the roster"),
        (status = 500, description = "Internal error"),
        (status = 502, description = "Identity provider error"),
        (status = 504, description = "Identity provider timed out")
    )
)]
pub async fn oauth_callback(
    State(state): State<CallbackApiState>,
    Query(params): Query<CallbackParams>,
    host: Option<Host>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Response {
    let request = CallbackRequest {
        code: params.code,
        state_token: jar
            .get(&state.state_cookie_name)
            .map(|c| c.value().to_string()),
        user_agent: header_str(&headers, header::USER_AGENT).unwrap_or_default(),
        host: host.map(|Host(host)| host),
        provider_error: params.error,
        provider_error_description: params.error_description,
    };

    match state.orchestrator.handle_callback(request).await {
        Ok(target) => (
            StatusCode::FOUND,
            [
                (header::LOCATION, target.location),
                (header::CACHE_CONTROL, "no-store".to_string()),
            ],
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Create the callback router
pub fn callback_router(state: CallbackApiState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(oauth_callback))
        .with_state(state)
}
