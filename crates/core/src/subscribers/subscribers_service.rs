use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::Arc;

use super::subscribers_model::{
    RegisterSubscriber, Subscriber, SubscriberChange, SubscriberMutation, UpdateSubscriberSymbol,
};
use super::subscribers_traits::{SubscriberRepositoryTrait, SubscriberServiceTrait};
use super::subscribers_validation::{validate_identity, validate_symbol};
use crate::errors::{DatabaseError, Error, Result};
use crate::idempotency::{Fingerprint, FingerprintEffects, IdempotencyGuard};

/// Coordinates subscriber mutations.
///
/// Each mutation runs inside one guard session: the fingerprint check, the
/// durable transaction and the cache update happen while no other mutation
/// can interleave.
pub struct SubscriberService {
    repository: Arc<dyn SubscriberRepositoryTrait>,
    guard: Arc<IdempotencyGuard>,
}

impl SubscriberService {
    pub fn new(repository: Arc<dyn SubscriberRepositoryTrait>, guard: Arc<IdempotencyGuard>) -> Self {
        Self { repository, guard }
    }

    /// The durable half of a mutation, detached from `self` so it can
    /// outlive the request that started it.
    fn run(
        &self,
        mutation: SubscriberMutation,
    ) -> impl std::future::Future<Output = Result<Option<Subscriber>>> + Send + 'static {
        let repository = self.repository.clone();
        async move { repository.apply_mutation(mutation).await }
    }

    fn require_subscriber(&self, identity: &str) -> Result<Subscriber> {
        self.repository
            .get_by_identity(identity)?
            .ok_or_else(|| Error::NotFound(format!("Subscriber '{}'", identity)))
    }
}

/// A unique-key clash on insert means someone else already registered.
fn map_register_conflict(err: Error, identity: &str) -> Error {
    match err {
        Error::Database(DatabaseError::UniqueViolation(_)) => {
            Error::DuplicateRequest(format!("'{}' is already registered", identity))
        }
        other => other,
    }
}

#[async_trait]
impl SubscriberServiceTrait for SubscriberService {
    fn login(&self, identity: &str) -> Result<Subscriber> {
        validate_identity(identity)?;
        self.require_subscriber(identity)
    }

    async fn register(&self, request: RegisterSubscriber) -> Result<Subscriber> {
        validate_identity(&request.identity)?;
        validate_symbol(&request.symbol)?;

        let fingerprint = Fingerprint::registration(&request.identity);
        fingerprint.verify(&request.fingerprint)?;

        let session = self.guard.begin().await;
        if session.check(&fingerprint).is_duplicate() {
            debug!("Duplicate registration for {}", request.identity);
            return Err(Error::DuplicateRequest(format!(
                "'{}' is already registered",
                request.identity
            )));
        }

        let mutation = SubscriberMutation {
            change: SubscriberChange::Register {
                identity: request.identity.clone(),
                symbol: request.symbol.clone(),
            },
            effects: FingerprintEffects::commit(fingerprint),
        };
        let effects = mutation.effects.clone();

        let subscriber = session
            .apply(effects, self.run(mutation))
            .await
            .map_err(|e| map_register_conflict(e, &request.identity))?
            .ok_or_else(|| Error::Unexpected("Registration produced no subscriber".to_string()))?;

        info!(
            "Registered subscriber {} tracking {}",
            subscriber.identity, subscriber.symbol
        );
        Ok(subscriber)
    }

    async fn update_symbol(&self, request: UpdateSubscriberSymbol) -> Result<Subscriber> {
        validate_identity(&request.identity)?;
        validate_symbol(&request.new_symbol)?;

        let fingerprint = Fingerprint::update(&request.identity, &request.new_symbol);
        fingerprint.verify(&request.fingerprint)?;

        let session = self.guard.begin().await;
        if session.check(&fingerprint).is_duplicate() {
            debug!(
                "Duplicate update for {} -> {}",
                request.identity, request.new_symbol
            );
            return Err(Error::DuplicateRequest(format!(
                "'{}' already tracks {}",
                request.identity, request.new_symbol
            )));
        }

        let current = self.require_subscriber(&request.identity)?;
        let mutation = SubscriberMutation {
            change: SubscriberChange::ChangeSymbol {
                subscriber_id: current.id.clone(),
                symbol: request.new_symbol.clone(),
            },
            effects: FingerprintEffects::commit(fingerprint)
                .revoking(Fingerprint::update(&current.identity, &current.symbol)),
        };
        let effects = mutation.effects.clone();

        let updated = session
            .apply(effects, self.run(mutation))
            .await?
            .ok_or_else(|| Error::NotFound(format!("Subscriber '{}'", request.identity)))?;

        info!(
            "Subscriber {} switched from {} to {}",
            updated.identity, current.symbol, updated.symbol
        );
        Ok(updated)
    }

    async fn delete(&self, identity: &str) -> Result<()> {
        validate_identity(identity)?;

        let session = self.guard.begin().await;
        let current = self.require_subscriber(identity)?;

        let effects = FingerprintEffects::default()
            .revoking(Fingerprint::registration(&current.identity))
            .revoking(Fingerprint::update(&current.identity, &current.symbol));
        let mutation = SubscriberMutation {
            change: SubscriberChange::Remove {
                subscriber_id: current.id.clone(),
            },
            effects: effects.clone(),
        };

        if let Some(left) = session
            .apply(effects, self.run(mutation))
            .await?
        {
            warn!("Delete of {} left subscriber {} behind", identity, left.id);
            return Err(Error::Unexpected(format!(
                "Subscriber '{}' was not deleted",
                identity
            )));
        }

        info!("Deleted subscriber {}", identity);
        Ok(())
    }

    fn list_subscribers(&self) -> Result<Vec<Subscriber>> {
        self.repository.list()
    }
}
