//! Subscriber domain models.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::idempotency::FingerprintEffects;

/// Domain model representing a subscriber and the symbol it tracks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub id: String,
    pub identity: String,
    pub symbol: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Input model for registering a subscriber
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSubscriber {
    pub identity: String,
    pub symbol: String,
    pub fingerprint: String,
}

/// Input model for changing a subscriber's symbol
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubscriberSymbol {
    pub identity: String,
    pub new_symbol: String,
    pub fingerprint: String,
}

/// The business half of a subscriber mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriberChange {
    /// Insert a new subscriber row.
    Register { identity: String, symbol: String },
    /// Replace the tracked symbol and purge the subscriber's samples.
    ChangeSymbol { subscriber_id: String, symbol: String },
    /// Delete the subscriber and all of its samples.
    Remove { subscriber_id: String },
}

/// One all-or-nothing unit of work for the subscriber store.
///
/// Repositories must apply `change` and persist `effects` (revocations
/// first, then the commit) inside a single transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriberMutation {
    pub change: SubscriberChange,
    pub effects: FingerprintEffects,
}
