//! In-memory test doubles for the repository and provider seams

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::login::{PendingLogin, PendingLoginRepository};
use crate::provider::{AccessToken, ExternalIdentity, IdentityProvider, ProviderError};
use crate::roster::{RosterLookup, RosterUser};
use crate::shared::error::{PlatformError, Result};

/// Pending login store backed by a `HashMap`, with call counters
#[derive(Default)]
pub struct InMemoryPendingLoginRepository {
    logins: Mutex<HashMap<String, PendingLogin>>,
    find_calls: AtomicUsize,
    save_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    fail_finds: AtomicBool,
    fail_saves: AtomicBool,
    fail_deletes: AtomicBool,
}

impl InMemoryPendingLoginRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, token: &str) -> Option<PendingLogin> {
        self.logins.lock().get(token).cloned()
    }

    pub fn len(&self) -> usize {
        self.logins.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn set_fail_finds(&self, fail: bool) {
        self.fail_finds.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PendingLoginRepository for InMemoryPendingLoginRepository {
    async fn insert(&self, login: &PendingLogin) -> Result<()> {
        self.logins.lock().insert(login.token.clone(), login.clone());
        Ok(())
    }

    async fn find_pending(
        &self,
        token: &str,
        created_after: DateTime<Utc>,
    ) -> Result<Option<PendingLogin>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_finds.load(Ordering::SeqCst) {
            return Err(PlatformError::internal("simulated find failure"));
        }

        Ok(self
            .logins
            .lock()
            .get(token)
            .filter(|login| login.created_at > created_after)
            .cloned())
    }

    async fn save_progress(&self, login: &PendingLogin) -> Result<bool> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(PlatformError::internal("simulated save failure"));
        }

        let mut logins = self.logins.lock();
        match logins.get_mut(&login.token) {
            Some(stored) if !stored.is_finalized() => {
                stored.cid = login.cid;
                stored.code = login.code.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, login: &PendingLogin) -> Result<bool> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(PlatformError::internal("simulated delete failure"));
        }

        Ok(self.logins.lock().remove(&login.token).is_some())
    }

    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut logins = self.logins.lock();
        let before = logins.len();
        logins.retain(|_, login| login.is_finalized() || login.created_at >= cutoff);
        Ok((before - logins.len()) as u64)
    }
}

/// Roster backed by a `HashMap`
#[derive(Default)]
pub struct InMemoryRoster {
    users: Mutex<HashMap<i64, RosterUser>>,
    lookup_calls: AtomicUsize,
    fail_lookups: AtomicBool,
}

impl InMemoryRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user: RosterUser) -> Self {
        self.users.lock().insert(user.cid, user);
        self
    }

    pub fn lookup_calls(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    pub fn set_fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RosterLookup for InMemoryRoster {
    async fn lookup(&self, cid: i64) -> Result<Option<RosterUser>> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(PlatformError::internal("simulated roster failure"));
        }
        Ok(self.users.lock().get(&cid).cloned())
    }
}

/// What a [`StubIdentityProvider`] answers with
#[derive(Debug, Clone)]
pub enum StubOutcome {
    Identity(ExternalIdentity),
    EmptyToken,
    Status(u16),
    Panic,
}

/// Identity provider that returns a canned outcome after an optional delay
pub struct StubIdentityProvider {
    outcome: StubOutcome,
    delay: Duration,
    exchange_calls: AtomicUsize,
    redirect_uris: Mutex<Vec<String>>,
}

impl StubIdentityProvider {
    pub fn new(outcome: StubOutcome) -> Self {
        Self {
            outcome,
            delay: Duration::ZERO,
            exchange_calls: AtomicUsize::new(0),
            redirect_uris: Mutex::new(Vec::new()),
        }
    }

    /// Identity with the given CID and placeholder names
    pub fn with_cid(cid: i64) -> Self {
        Self::new(StubOutcome::Identity(ExternalIdentity {
            cid,
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            full_name: "Test User".to_string(),
        }))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    /// `redirect_uri` values seen by `exchange_code`
    pub fn redirect_uris(&self) -> Vec<String> {
        self.redirect_uris.lock().clone()
    }
}

#[async_trait]
impl IdentityProvider for StubIdentityProvider {
    async fn exchange_code(
        &self,
        _code: &str,
        redirect_uri: &str,
    ) -> std::result::Result<AccessToken, ProviderError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        self.redirect_uris.lock().push(redirect_uri.to_string());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match &self.outcome {
            StubOutcome::Identity(_) => Ok(AccessToken::new("stub-token")),
            StubOutcome::EmptyToken => Err(ProviderError::EmptyToken),
            StubOutcome::Status(status) => Err(ProviderError::Status {
                endpoint: "token",
                status: *status,
                body: String::new(),
            }),
            StubOutcome::Panic => panic!("stub provider panicked"),
        }
    }

    async fn fetch_profile(
        &self,
        _token: &AccessToken,
    ) -> std::result::Result<ExternalIdentity, ProviderError> {
        match &self.outcome {
            StubOutcome::Identity(identity) => Ok(identity.clone()),
            _ => Err(ProviderError::EmptyToken),
        }
    }
}
