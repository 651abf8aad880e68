//! In-memory repositories shared by the service tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::errors::{DatabaseError, Result};
use crate::idempotency::{Fingerprint, FingerprintKind, FingerprintRecords, FingerprintStore};
use crate::prices::{NewPriceSample, PriceSample, PriceSampleRepositoryTrait};
use crate::subscribers::{
    Subscriber, SubscriberChange, SubscriberMutation, SubscriberRepositoryTrait,
};

#[derive(Default)]
struct State {
    subscribers: Vec<Subscriber>,
    samples: Vec<PriceSample>,
    registrations: HashSet<String>,
    updates: HashSet<String>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn set_mut(&mut self, kind: FingerprintKind) -> &mut HashSet<String> {
        match kind {
            FingerprintKind::Registration => &mut self.registrations,
            FingerprintKind::Update => &mut self.updates,
        }
    }
}

/// Transactional stand-in for the SQLite repositories.
///
/// A mutation either applies completely or, when failure is armed, not at all.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    fail_next_mutation: AtomicBool,
}

pub fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 13)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

/// A sample for `subscriber` captured `minute` minutes after [`base_time`].
pub fn sample_at(subscriber: &Subscriber, value: f64, minute: i64) -> NewPriceSample {
    NewPriceSample {
        subscriber_id: subscriber.id.clone(),
        symbol: subscriber.symbol.clone(),
        value,
        captured_at: base_time() + Duration::minutes(minute),
    }
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed_subscriber(&self, identity: &str, symbol: &str) -> Subscriber {
        let mut state = self.state.lock().unwrap();
        let subscriber = Subscriber {
            id: state.next_id("sub"),
            identity: identity.to_string(),
            symbol: symbol.to_string(),
            created_at: base_time(),
            updated_at: base_time(),
        };
        state.subscribers.push(subscriber.clone());
        state
            .registrations
            .insert(Fingerprint::registration(identity).digest().to_string());
        subscriber
    }

    pub fn seed_sample(&self, sample: NewPriceSample) {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id("sample");
        state.samples.push(PriceSample {
            id,
            subscriber_id: sample.subscriber_id,
            symbol: sample.symbol,
            value: sample.value,
            captured_at: sample.captured_at,
        });
    }

    pub fn fail_next_mutation(&self) {
        self.fail_next_mutation.store(true, Ordering::SeqCst);
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().unwrap().subscribers.len()
    }

    pub fn sample_count(&self, subscriber_id: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .samples
            .iter()
            .filter(|s| s.subscriber_id == subscriber_id)
            .count()
    }

    pub fn has_fingerprint(&self, fingerprint: &Fingerprint) -> bool {
        let state = self.state.lock().unwrap();
        match fingerprint.kind() {
            FingerprintKind::Registration => state.registrations.contains(fingerprint.digest()),
            FingerprintKind::Update => state.updates.contains(fingerprint.digest()),
        }
    }
}

impl FingerprintStore for InMemoryStore {
    fn load_fingerprints(&self) -> Result<FingerprintRecords> {
        let state = self.state.lock().unwrap();
        Ok(FingerprintRecords {
            registrations: state.registrations.iter().cloned().collect(),
            updates: state.updates.iter().cloned().collect(),
        })
    }
}

#[async_trait]
impl SubscriberRepositoryTrait for InMemoryStore {
    fn get_by_identity(&self, identity: &str) -> Result<Option<Subscriber>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .subscribers
            .iter()
            .find(|s| s.identity == identity)
            .cloned())
    }

    fn list(&self) -> Result<Vec<Subscriber>> {
        Ok(self.state.lock().unwrap().subscribers.clone())
    }

    async fn apply_mutation(&self, mutation: SubscriberMutation) -> Result<Option<Subscriber>> {
        // Give concurrent callers a chance to interleave.
        tokio::task::yield_now().await;

        if self.fail_next_mutation.swap(false, Ordering::SeqCst) {
            return Err(DatabaseError::TransactionFailed("injected failure".into()).into());
        }

        let mut state = self.state.lock().unwrap();
        let result = match mutation.change {
            SubscriberChange::Register { identity, symbol } => {
                if state.subscribers.iter().any(|s| s.identity == identity) {
                    return Err(DatabaseError::UniqueViolation(identity).into());
                }
                let subscriber = Subscriber {
                    id: state.next_id("sub"),
                    identity,
                    symbol,
                    created_at: base_time(),
                    updated_at: base_time(),
                };
                state.subscribers.push(subscriber.clone());
                Some(subscriber)
            }
            SubscriberChange::ChangeSymbol {
                subscriber_id,
                symbol,
            } => {
                if !state.subscribers.iter().any(|s| s.id == subscriber_id) {
                    return Err(DatabaseError::NotFound(subscriber_id).into());
                }
                state.samples.retain(|s| s.subscriber_id != subscriber_id);
                state
                    .subscribers
                    .iter_mut()
                    .find(|s| s.id == subscriber_id)
                    .map(|subscriber| {
                        subscriber.symbol = symbol;
                        subscriber.clone()
                    })
            }
            SubscriberChange::Remove { subscriber_id } => {
                state.samples.retain(|s| s.subscriber_id != subscriber_id);
                state.subscribers.retain(|s| s.id != subscriber_id);
                None
            }
        };

        for stale in mutation.effects.revoke {
            state.set_mut(stale.kind()).remove(stale.digest());
        }
        if let Some(applied) = mutation.effects.commit {
            state
                .set_mut(applied.kind())
                .insert(applied.digest().to_string());
        }
        Ok(result)
    }
}

#[async_trait]
impl PriceSampleRepositoryTrait for InMemoryStore {
    fn latest(&self, subscriber_id: &str) -> Result<Option<PriceSample>> {
        Ok(self.recent(subscriber_id, 1)?.into_iter().next())
    }

    fn recent(&self, subscriber_id: &str, limit: i64) -> Result<Vec<PriceSample>> {
        let state = self.state.lock().unwrap();
        let mut samples: Vec<PriceSample> = state
            .samples
            .iter()
            .filter(|s| s.subscriber_id == subscriber_id)
            .cloned()
            .collect();
        samples.sort_by(|a, b| b.captured_at.cmp(&a.captured_at));
        samples.truncate(limit.max(0) as usize);
        Ok(samples)
    }

    async fn append_batch(&self, samples: Vec<NewPriceSample>) -> Result<usize> {
        let mut written = 0;
        for sample in samples {
            let tracked = {
                let state = self.state.lock().unwrap();
                state
                    .subscribers
                    .iter()
                    .any(|s| s.id == sample.subscriber_id && s.symbol == sample.symbol)
            };
            if tracked {
                self.seed_sample(sample);
                written += 1;
            }
        }
        Ok(written)
    }
}
