//! Tickerwatch Core - Domain entities, services, and traits.
//!
//! This crate holds the subscriber mutation path (with its idempotency
//! guard) and the price query and refresh services. It is
//! database-agnostic and defines traits that are implemented by the
//! `storage-sqlite` crate.

pub mod errors;
pub mod idempotency;
pub mod prices;
pub mod subscribers;

#[cfg(test)]
pub(crate) mod testing;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
