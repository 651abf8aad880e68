//! Idempotency module - mutation fingerprints and the dedup guard.
//!
//! Every mutating request carries a fingerprint that must hash the request's
//! own fields. The guard remembers fingerprints of applied mutations in a
//! volatile cache backed by durable records, so a replayed request is
//! recognised as a duplicate even after a restart.

mod fingerprint;
mod guard;

pub use fingerprint::{Fingerprint, FingerprintEffects, FingerprintKind};
pub use guard::{Check, FingerprintRecords, FingerprintStore, GuardSession, IdempotencyGuard};
