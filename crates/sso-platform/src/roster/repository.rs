//! Roster lookup

use async_trait::async_trait;
use mongodb::{bson::doc, Collection, Database};

use crate::roster::entity::RosterUser;
use crate::shared::error::Result;

pub const ROSTER_COLLECTION: &str = "users";

/// Read-only membership check against the roster
#[async_trait]
pub trait RosterLookup: Send + Sync {
    /// `Ok(None)` means the CID is not on the roster
    async fn lookup(&self, cid: i64) -> Result<Option<RosterUser>>;
}

pub struct MongoRosterRepository {
    collection: Collection<RosterUser>,
}

impl MongoRosterRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(ROSTER_COLLECTION),
        }
    }
}

#[async_trait]
impl RosterLookup for MongoRosterRepository {
    async fn lookup(&self, cid: i64) -> Result<Option<RosterUser>> {
        Ok(self.collection.find_one(doc! { "_id": cid }).await?)
    }
}
