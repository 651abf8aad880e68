//! Volatile fingerprint cache kept consistent with its durable records.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::fingerprint::{Fingerprint, FingerprintEffects, FingerprintKind};
use crate::errors::{Error, Result};

/// Result of looking a fingerprint up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Fresh,
    Duplicate,
}

impl Check {
    pub fn is_duplicate(self) -> bool {
        self == Check::Duplicate
    }
}

/// Every durable fingerprint, as loaded at startup.
#[derive(Debug, Clone, Default)]
pub struct FingerprintRecords {
    pub registrations: Vec<String>,
    pub updates: Vec<String>,
}

/// Durable side of the guard.
pub trait FingerprintStore: Send + Sync {
    fn load_fingerprints(&self) -> Result<FingerprintRecords>;
}

#[derive(Debug, Default)]
struct FingerprintCache {
    registrations: HashSet<String>,
    updates: HashSet<String>,
}

impl FingerprintCache {
    fn set(&self, kind: FingerprintKind) -> &HashSet<String> {
        match kind {
            FingerprintKind::Registration => &self.registrations,
            FingerprintKind::Update => &self.updates,
        }
    }

    fn set_mut(&mut self, kind: FingerprintKind) -> &mut HashSet<String> {
        match kind {
            FingerprintKind::Registration => &mut self.registrations,
            FingerprintKind::Update => &mut self.updates,
        }
    }

    fn check(&self, fingerprint: &Fingerprint) -> Check {
        if self.set(fingerprint.kind()).contains(fingerprint.digest()) {
            Check::Duplicate
        } else {
            Check::Fresh
        }
    }

    fn settle(&mut self, effects: FingerprintEffects) {
        for stale in effects.revoke {
            self.set_mut(stale.kind()).remove(stale.digest());
        }
        if let Some(applied) = effects.commit {
            self.set_mut(applied.kind()).insert(applied.digest().to_string());
        }
    }
}

/// Fingerprint-keyed dedup state for registration and update mutations.
///
/// The durable records are the source of truth. The cache is rebuilt from
/// them at startup and only changes after the transaction carrying the same
/// change has committed, so the two never disagree about an applied effect.
/// That holds even when the caller gives up on a mutation halfway: see
/// [`GuardSession::apply`].
#[derive(Debug, Default)]
pub struct IdempotencyGuard {
    cache: Arc<Mutex<FingerprintCache>>,
}

impl IdempotencyGuard {
    /// An empty guard, for a store with no fingerprint records.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: FingerprintRecords) -> Self {
        let cache = FingerprintCache {
            registrations: records.registrations.into_iter().collect(),
            updates: records.updates.into_iter().collect(),
        };
        Self {
            cache: Arc::new(Mutex::new(cache)),
        }
    }

    /// Build the guard from every fingerprint persisted in `store`.
    pub fn rebuild<S>(store: &S) -> Result<Self>
    where
        S: FingerprintStore + ?Sized,
    {
        let records = store.load_fingerprints()?;
        info!(
            "Rebuilt idempotency cache: {} registration, {} update fingerprints",
            records.registrations.len(),
            records.updates.len()
        );
        Ok(Self::from_records(records))
    }

    /// Read-only lookup.
    pub async fn check(&self, fingerprint: &Fingerprint) -> Check {
        self.cache.lock().await.check(fingerprint)
    }

    /// Number of cached (registration, update) fingerprints.
    pub async fn counts(&self) -> (usize, usize) {
        let cache = self.cache.lock().await;
        (cache.registrations.len(), cache.updates.len())
    }

    /// Start a mutation.
    ///
    /// The returned session holds the guard's lock until it is applied or
    /// dropped, so check-then-apply is atomic with respect to every other
    /// mutation.
    pub async fn begin(&self) -> GuardSession {
        GuardSession {
            cache: self.cache.clone().lock_owned().await,
        }
    }
}

/// Exclusive access to the guard for the span of one mutation.
pub struct GuardSession {
    cache: OwnedMutexGuard<FingerprintCache>,
}

impl GuardSession {
    pub fn check(&self, fingerprint: &Fingerprint) -> Check {
        self.cache.check(fingerprint)
    }

    /// Run the durable mutation, then mirror `effects` into the cache.
    ///
    /// `mutation` must persist the same effects in its own transaction. If it
    /// fails the cache is left exactly as it was.
    ///
    /// The mutation and the cache update run on their own task, which owns
    /// the session. Dropping the returned future does not stop a write that
    /// is already queued, so the cache still follows it, and the next
    /// session only starts once it has settled.
    pub async fn apply<T, Fut>(self, effects: FingerprintEffects, mutation: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let mut cache = self.cache;
        let settled = tokio::spawn(async move {
            let value = mutation.await?;
            debug!(
                "Settling idempotency cache: commit={:?} revoke={}",
                effects.commit.as_ref().map(|f| f.kind()),
                effects.revoke.len()
            );
            cache.settle(effects);
            Ok(value)
        });

        settled.await.map_err(|e| {
            warn!("Guarded mutation task did not finish: {}", e);
            Error::Unexpected(format!("Mutation task failed: {}", e))
        })?
    }
}
