//! Pending Login Repository
//!
//! Storage for in-flight login attempts. Records are short-lived and
//! single-use: the callback finalizes each record at most once.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::{bson::doc, Collection, Database};

use crate::login::entity::PendingLogin;
use crate::shared::error::{PlatformError, Result};

/// Name of the MongoDB collection holding pending logins
pub const PENDING_LOGIN_COLLECTION: &str = "oauth_logins";

/// Persistence operations used by the callback flow
#[async_trait]
pub trait PendingLoginRepository: Send + Sync {
    /// Store a new pending login
    async fn insert(&self, login: &PendingLogin) -> Result<()>;

    /// Find a pending login by state token, created strictly after `created_after`
    async fn find_pending(
        &self,
        token: &str,
        created_after: DateTime<Utc>,
    ) -> Result<Option<PendingLogin>>;

    /// Persist the roster CID and one-time code of a finalized login.
    ///
    /// Only applies while the stored record has no code yet. Returns `false`
    /// when the record is gone or was finalized by a concurrent callback.
    async fn save_progress(&self, login: &PendingLogin) -> Result<bool>;

    /// Remove a pending login
    async fn delete(&self, login: &PendingLogin) -> Result<bool>;

    /// Remove every unfinalized pending login created before `cutoff`.
    ///
    /// Finalized records hold a one-time code the caller has yet to redeem
    /// and are left alone.
    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// MongoDB-backed pending login store
pub struct MongoPendingLoginRepository {
    collection: Collection<PendingLogin>,
}

impl MongoPendingLoginRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(PENDING_LOGIN_COLLECTION),
        }
    }
}

#[async_trait]
impl PendingLoginRepository for MongoPendingLoginRepository {
    async fn insert(&self, login: &PendingLogin) -> Result<()> {
        self.collection.insert_one(login).await?;
        Ok(())
    }

    async fn find_pending(
        &self,
        token: &str,
        created_after: DateTime<Utc>,
    ) -> Result<Option<PendingLogin>> {
        let threshold = mongodb::bson::DateTime::from_chrono(created_after);
        Ok(self
            .collection
            .find_one(doc! {
                "_id": token,
                "createdAt": { "$gt": threshold }
            })
            .await?)
    }

    async fn save_progress(&self, login: &PendingLogin) -> Result<bool> {
        let (Some(cid), Some(code)) = (login.cid, login.code.as_deref()) else {
            return Err(PlatformError::internal("save_progress called on unfinalized login"));
        };

        let result = self
            .collection
            .update_one(
                doc! { "_id": login.token.as_str(), "code": null },
                doc! { "$set": { "cid": cid, "code": code } },
            )
            .await?;
        Ok(result.modified_count > 0)
    }

    async fn delete(&self, login: &PendingLogin) -> Result<bool> {
        let result = self
            .collection
            .delete_one(doc! { "_id": login.token.as_str() })
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let cutoff = mongodb::bson::DateTime::from_chrono(cutoff);
        let result = self
            .collection
            .delete_many(doc! { "createdAt": { "$lt": cutoff }, "code": null })
            .await?;
        Ok(result.deleted_count)
    }
}
