//! Provider protection.
//!
//! This module holds the circuit breaker that sits between the refresh job
//! and the price source, plus the small traits it is generic over.

mod circuit_breaker;

pub use circuit_breaker::{
    CallOutcome, CircuitBreaker, CircuitBreakerConfig, CircuitOpenError, CircuitSnapshot,
    CircuitState, Clock, DependencyFailure, SystemClock,
};
