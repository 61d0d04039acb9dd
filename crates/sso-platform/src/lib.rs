//! SSO Platform
//!
//! Server side of an OAuth2 authorization code login:
//! - Pending login records bound to a browser by a state cookie
//! - Code-for-token exchange and identity lookup at the provider
//! - Roster membership check
//! - One-time login code handed back to the original caller
//!
//! ## Module Organization
//!
//! - `login` - pending login entity, repository, code generation, cleanup
//! - `roster` - roster entity and lookup
//! - `provider` - identity provider trait and HTTP client
//! - `callback` - orchestrator and `GET /callback` endpoint

pub mod callback;
pub mod login;
pub mod provider;
pub mod roster;

// Shared infrastructure
pub mod shared;

// In-memory implementations for tests and local runs
pub mod mock;

pub use shared::error::{PlatformError, Result};

pub use callback::{
    callback_router, CallbackApiState, CallbackError, CallbackOrchestrator, CallbackRequest,
    CallbackSettings, RedirectTarget,
};
pub use login::{
    spawn_expired_sweeper, CleanupQueue, MongoPendingLoginRepository, PendingLogin,
    PendingLoginRepository,
};
pub use provider::{
    AccessToken, ExternalIdentity, IdentityProvider, IdentityProviderClient, ProviderError,
    ProviderSettings,
};
pub use roster::{MongoRosterRepository, RosterLookup, RosterUser};
