//! Pending login cleanup
//!
//! Deletions requested by the callback run on a supervised worker so the
//! response never waits on them. A separate sweeper removes attempts that
//! were abandoned and aged out of the validity window.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::login::entity::PendingLogin;
use crate::login::repository::PendingLoginRepository;
use crate::shared::error::{PlatformError, Result};

/// Handle for scheduling pending-login deletions
#[derive(Clone)]
pub struct CleanupQueue {
    tx: mpsc::UnboundedSender<PendingLogin>,
}

impl CleanupQueue {
    /// Start the cleanup worker.
    ///
    /// The worker drains the queue until every `CleanupQueue` clone is
    /// dropped, then exits; await the handle to flush on shutdown.
    pub fn spawn(repo: Arc<dyn PendingLoginRepository>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<PendingLogin>();

        let handle = tokio::spawn(async move {
            while let Some(login) = rx.recv().await {
                match repo.delete(&login).await {
                    Ok(true) => debug!("Deleted rejected pending login"),
                    Ok(false) => debug!("Pending login already gone"),
                    Err(e) => warn!(error = %e, "Failed to delete pending login"),
                }
            }
            debug!("Cleanup worker stopped");
        });

        (Self { tx }, handle)
    }

    /// Queue a pending login for deletion. Never blocks.
    pub fn schedule(&self, login: PendingLogin) {
        if self.tx.send(login).is_err() {
            warn!("Cleanup worker not running, pending login left for the sweeper");
        }
    }
}

/// Delete every unfinalized pending login older than `window`
pub async fn sweep_expired(repo: &dyn PendingLoginRepository, window: Duration) -> Result<u64> {
    let window = chrono::Duration::from_std(window)
        .map_err(|e| PlatformError::internal(format!("sweep window out of range: {}", e)))?;
    let deleted = repo.delete_expired(Utc::now() - window).await?;

    if deleted > 0 {
        info!(count = deleted, "Removed expired pending logins");
    } else {
        debug!("No expired pending logins");
    }

    Ok(deleted)
}

/// Periodically sweep expired pending logins
pub fn spawn_expired_sweeper(
    repo: Arc<dyn PendingLoginRepository>,
    window: Duration,
    every: Duration,
) -> JoinHandle<()> {
    info!(
        window_secs = window.as_secs(),
        interval_secs = every.as_secs(),
        "Starting expired pending login sweeper"
    );

    tokio::spawn(async move {
        let mut ticker = interval(every);
        loop {
            ticker.tick().await;
            if let Err(e) = sweep_expired(repo.as_ref(), window).await {
                error!(error = %e, "Error in expired pending login sweep");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::InMemoryPendingLoginRepository;

    #[tokio::test]
    async fn test_scheduled_token_is_deleted() {
        let repo = Arc::new(InMemoryPendingLoginRepository::new());
        let login = PendingLogin::new("doomed", "ua", "https://r", "s");
        repo.insert(&login).await.unwrap();

        let (queue, handle) = CleanupQueue::spawn(repo.clone());
        queue.schedule(login);
        drop(queue);
        handle.await.unwrap();

        assert!(repo.get("doomed").is_none());
        assert_eq!(repo.delete_calls(), 1);
    }

    #[tokio::test]
    async fn test_worker_survives_delete_errors() {
        let repo = Arc::new(InMemoryPendingLoginRepository::new());
        let login = PendingLogin::new("a", "ua", "https://r", "s");
        repo.insert(&login).await.unwrap();
        repo.set_fail_deletes(true);

        let (queue, handle) = CleanupQueue::spawn(repo.clone());
        queue.schedule(login.clone());
        queue.schedule(PendingLogin::new("b", "ua", "https://r", "s"));
        drop(queue);
        handle.await.unwrap();

        assert_eq!(repo.delete_calls(), 2);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_stale() {
        let repo = InMemoryPendingLoginRepository::new();
        let now = Utc::now();
        repo.insert(&PendingLogin::new("fresh", "ua", "r", "s").with_created_at(now))
            .await
            .unwrap();
        repo.insert(
            &PendingLogin::new("stale", "ua", "r", "s")
                .with_created_at(now - chrono::Duration::minutes(10)),
        )
        .await
        .unwrap();

        let deleted = sweep_expired(&repo, Duration::from_secs(300)).await.unwrap();

        assert_eq!(deleted, 1);
        assert!(repo.get("fresh").is_some());
        assert!(repo.get("stale").is_none());
    }

    #[tokio::test]
    async fn test_sweep_keeps_finalized_logins() {
        let repo = InMemoryPendingLoginRepository::new();
        let mut finalized = PendingLogin::new("redeemable", "ua", "r", "s")
            .with_created_at(Utc::now() - chrono::Duration::seconds(301));
        finalized.finalize(1234567, "one-time-code".to_string());
        repo.insert(&finalized).await.unwrap();

        let deleted = sweep_expired(&repo, Duration::from_secs(300)).await.unwrap();

        assert_eq!(deleted, 0);
        assert_eq!(
            repo.get("redeemable").unwrap().code.as_deref(),
            Some("one-time-code")
        );
    }

    #[tokio::test]
    async fn test_sweep_rejects_out_of_range_window() {
        let repo = InMemoryPendingLoginRepository::new();
        repo.insert(
            &PendingLogin::new("stale", "ua", "r", "s")
                .with_created_at(Utc::now() - chrono::Duration::minutes(10)),
        )
        .await
        .unwrap();

        let result = sweep_expired(&repo, Duration::from_secs(u64::MAX)).await;

        assert!(matches!(result, Err(PlatformError::Internal { .. })));
        assert!(repo.get("stale").is_some());
    }
}
