//! Shared infrastructure for the SSO callback service.

pub mod logging;

pub use logging::{init_logging, LogFormat};
