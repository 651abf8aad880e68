//! SQLite storage implementation for Tickerwatch.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the repository traits defined in `tickerwatch-core` and contains:
//! - Database connection pooling and management
//! - Diesel migrations
//! - The single writer actor every write goes through
//! - Repository implementations for subscribers, fingerprints and price samples
//!
//! ```text
//!        core (domain)
//!              │
//!              ▼
//!   storage-sqlite (this crate)
//!              │
//!              ▼
//!          SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod schema;

// Repository implementations
pub mod prices;
pub mod subscribers;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, init, run_migrations, spawn_writer, DbConnection, DbPool,
    WriteHandle,
};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

pub use prices::PriceSampleRepository;
pub use subscribers::SubscriberRepository;

// Re-export from tickerwatch-core for convenience
pub use tickerwatch_core::errors::{DatabaseError, Error, Result};
