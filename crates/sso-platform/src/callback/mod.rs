//! Callback Module
//!
//! The authorization code callback: error taxonomy, the orchestrating state
//! machine and its HTTP endpoint.

pub mod api;
pub mod error;
pub mod orchestrator;

pub use api::{callback_router, CallbackApiState, CallbackParams};
pub use error::CallbackError;
pub use orchestrator::{CallbackOrchestrator, CallbackRequest, CallbackSettings, RedirectTarget};
