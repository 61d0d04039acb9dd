//! Platform Error Types
//!
//! Errors raised by the storage layer. The callback flow translates these
//! into [`CallbackError`](crate::callback::CallbackError) before anything
//! reaches the browser.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PlatformError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PlatformError>;
