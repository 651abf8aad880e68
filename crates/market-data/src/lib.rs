//! Tickerwatch Market Data Crate
//!
//! This crate isolates everything that talks to the outside price world:
//!
//! - [`PriceSource`] - the trait a quote provider implements
//! - [`YahooProvider`] - the production provider backed by Yahoo Finance
//! - [`CircuitBreaker`] - fail-fast gate in front of a flaky provider
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +------------------+     +------------------+
//! |  Refresh job     | --> |  CircuitBreaker  | --> |   PriceSource    |
//! |  (core crate)    |     |  (guarded_call)  |     |  (Yahoo, mocks)  |
//! +------------------+     +------------------+     +------------------+
//!                                                           |
//!                                                           v
//!                                                   +------------------+
//!                                                   |    PriceBatch    |
//!                                                   +------------------+
//! ```
//!
//! The breaker never swallows the provider's result: callers get back
//! [`CallOutcome::Success`], [`CallOutcome::Failure`] carrying the provider's own
//! error, or [`CallOutcome::Rejected`] when the circuit refused the call.

pub mod errors;
pub mod models;
pub mod provider;
pub mod registry;

pub use errors::MarketDataError;
pub use models::PriceBatch;
pub use provider::yahoo::YahooProvider;
pub use provider::PriceSource;
pub use registry::{
    CallOutcome, CircuitBreaker, CircuitBreakerConfig, CircuitOpenError, CircuitSnapshot,
    CircuitState, Clock, DependencyFailure, SystemClock,
};
