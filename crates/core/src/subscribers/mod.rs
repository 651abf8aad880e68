//! Subscribers module - domain models, services, and traits.

mod subscribers_model;
mod subscribers_service;
mod subscribers_traits;
mod subscribers_validation;


pub use subscribers_model::{
    RegisterSubscriber, Subscriber, SubscriberChange, SubscriberMutation, UpdateSubscriberSymbol,
};
pub use subscribers_service::SubscriberService;
pub use subscribers_traits::{SubscriberRepositoryTrait, SubscriberServiceTrait};
pub use subscribers_validation::{validate_identity, validate_symbol};
