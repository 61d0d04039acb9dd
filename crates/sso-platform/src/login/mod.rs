//! Pending Login Module
//!
//! In-flight login attempts, their storage, one-time code generation and
//! cleanup of rejected or abandoned attempts.

pub mod cleanup;
pub mod code;
pub mod entity;
pub mod repository;

pub use cleanup::{spawn_expired_sweeper, sweep_expired, CleanupQueue};
pub use code::{generate_login_code, LOGIN_CODE_LENGTH};
pub use entity::PendingLogin;
pub use repository::{MongoPendingLoginRepository, PendingLoginRepository, PENDING_LOGIN_COLLECTION};
