//! Shared Module
//!
//! Cross-cutting concerns.

pub mod error;

pub use error::{PlatformError, Result};
