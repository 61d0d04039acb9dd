//! Roster Module
//!
//! Membership list of users allowed to complete a login.

pub mod entity;
pub mod repository;

pub use entity::RosterUser;
pub use repository::{MongoRosterRepository, RosterLookup, ROSTER_COLLECTION};
