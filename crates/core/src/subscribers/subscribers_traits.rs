//! Subscriber repository and service traits.
//!
//! These traits define the contract for subscriber operations without any
//! database-specific types, allowing for different storage implementations.

use async_trait::async_trait;

use super::subscribers_model::{
    RegisterSubscriber, Subscriber, SubscriberMutation, UpdateSubscriberSymbol,
};
use crate::errors::Result;
use crate::idempotency::FingerprintStore;

/// Trait defining the contract for Subscriber repository operations.
///
/// The repository also owns the durable fingerprint records, which is what
/// lets a mutation and its dedup bookkeeping share one transaction.
#[async_trait]
pub trait SubscriberRepositoryTrait: FingerprintStore + Send + Sync {
    /// Looks a subscriber up by identity.
    fn get_by_identity(&self, identity: &str) -> Result<Option<Subscriber>>;

    /// Lists every subscriber.
    fn list(&self) -> Result<Vec<Subscriber>>;

    /// Applies a mutation and its fingerprint effects atomically.
    ///
    /// Returns the subscriber as it stands afterwards, or `None` when the
    /// mutation removed it.
    async fn apply_mutation(&self, mutation: SubscriberMutation) -> Result<Option<Subscriber>>;
}

/// Trait defining the contract for Subscriber service operations.
#[async_trait]
pub trait SubscriberServiceTrait: Send + Sync {
    /// Succeeds iff a subscriber with this identity exists.
    fn login(&self, identity: &str) -> Result<Subscriber>;

    async fn register(&self, request: RegisterSubscriber) -> Result<Subscriber>;

    async fn update_symbol(&self, request: UpdateSubscriberSymbol) -> Result<Subscriber>;

    async fn delete(&self, identity: &str) -> Result<()>;

    fn list_subscribers(&self) -> Result<Vec<Subscriber>>;
}
