//! Callback error taxonomy
//!
//! Every variant is terminal. The `detail` string is for logs only; the
//! browser sees a fixed message per variant and the status code.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CallbackError {
    /// Missing code or state cookie, or the provider reported an error
    #[error("Invalid request: {detail}")]
    InvalidRequest { detail: String },

    /// State token unknown, expired, already used, or bound to another browser
    #[error("Invalid token: {detail}")]
    InvalidToken { detail: String },

    /// Identity provider failed or returned garbage
    #[error("Upstream error: {detail}")]
    UpstreamError { detail: String },

    /// Identity provider did not answer before the exchange deadline
    #[error("Upstream timeout: {detail}")]
    UpstreamTimeout { detail: String },

    /// Identity is valid but not on the roster
    #[error("Not authorized: {detail}")]
    NotAuthorized { detail: String },

    #[error("Internal failure: {detail}")]
    InternalFailure { detail: String },
}

impl CallbackError {
    pub fn invalid_request(detail: impl Into<String>) -> Self {
        Self::InvalidRequest { detail: detail.into() }
    }

    pub fn invalid_token(detail: impl Into<String>) -> Self {
        Self::InvalidToken { detail: detail.into() }
    }

    pub fn upstream(detail: impl Into<String>) -> Self {
        Self::UpstreamError { detail: detail.into() }
    }

    pub fn upstream_timeout(detail: impl Into<String>) -> Self {
        Self::UpstreamTimeout { detail: detail.into() }
    }

    pub fn not_authorized(detail: impl Into<String>) -> Self {
        Self::NotAuthorized { detail: detail.into() }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::InternalFailure { detail: detail.into() }
    }

    /// Internal diagnostic text
    pub fn detail(&self) -> &str {
        match self {
            Self::InvalidRequest { detail }
            | Self::InvalidToken { detail }
            | Self::UpstreamError { detail }
            | Self::UpstreamTimeout { detail }
            | Self::NotAuthorized { detail }
            | Self::InternalFailure { detail } => detail,
        }
    }

    /// Short machine-readable kind, used as a log field
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "INVALID_REQUEST",
            Self::InvalidToken { .. } => "INVALID_TOKEN",
            Self::UpstreamError { .. } => "UPSTREAM_ERROR",
            Self::UpstreamTimeout { .. } => "UPSTREAM_TIMEOUT",
            Self::NotAuthorized { .. } => "NOT_AUTHORIZED",
            Self::InternalFailure { .. } => "INTERNAL_FAILURE",
        }
    }

    /// Message shown to the user
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => {
                "Invalid response received from Authenticator or Authentication cancelled."
            }
            Self::InvalidToken { .. } => "Token is invalid.",
            Self::UpstreamError { .. } => "Internal Error while getting user data from Authenticator.",
            Self::UpstreamTimeout { .. } => "Authenticator took too long to respond. Please try again.",
            Self::NotAuthorized { .. } => {
                "You are not part of our roster, so you are unable to login."
            }
            Self::InternalFailure { .. } => "Internal Error. Please try again later.",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            Self::InvalidToken { .. } => StatusCode::UNAUTHORIZED,
            Self::UpstreamError { .. } => StatusCode::BAD_GATEWAY,
            Self::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::NotAuthorized { .. } => StatusCode::FORBIDDEN,
            Self::InternalFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn error_page(status: StatusCode, message: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Login Error</title></head>\n\
         <body>\n<h1>Login failed</h1>\n<p>{}</p>\n<p><small>{}</small></p>\n</body>\n</html>\n",
        message,
        status.as_u16()
    )
}

impl IntoResponse for CallbackError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Html(error_page(status, self.user_message()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(CallbackError::invalid_request("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(CallbackError::invalid_token("x").status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(CallbackError::not_authorized("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(CallbackError::upstream("x").status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(CallbackError::upstream_timeout("x").status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            CallbackError::internal("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_detail_kept_out_of_user_message() {
        let err = CallbackError::internal("mongodb: connection refused at 10.0.0.4");
        assert_eq!(err.detail(), "mongodb: connection refused at 10.0.0.4");
        assert!(!err.user_message().contains("mongodb"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_error_page_contains_only_user_message() {
        let page = error_page(StatusCode::FORBIDDEN, CallbackError::not_authorized("cid 42").user_message());
        assert!(page.contains("not part of our roster"));
        assert!(page.contains("403"));
        assert!(!page.contains("cid 42"));
    }
}
