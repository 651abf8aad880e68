//! Circuit breaker for a single external dependency.
//!
//! Implements the circuit breaker pattern so a failing price provider is
//! not hammered on every refresh cycle. The circuit has three states:
//!
//! - **Closed**: Normal operation, calls go through. Dependency failures are
//!   counted; reaching `max_failures` opens the circuit.
//! - **Open**: Calls are rejected without touching the dependency until
//!   `reset_timeout` has elapsed since the circuit opened.
//! - **HalfOpen**: Exactly one trial call is in flight. Success closes the
//!   circuit and clears the counter, failure re-opens it.
//!
//! A success while Closed leaves the failure counter untouched; only a
//! successful trial resets it.
//!
//! The breaker is in-memory and resets on application restart.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::Serialize;
use thiserror::Error;

/// Default number of failures before opening the circuit.
const DEFAULT_MAX_FAILURES: u32 = 5;

/// Default time the circuit stays open before a trial call is allowed.
const DEFAULT_RESET_TIMEOUT: Duration = Duration::from_secs(20);

/// Source of "now" for timeout arithmetic.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Classifies an error as a failure of the protected dependency.
///
/// Only dependency failures move the circuit toward Open. Any other error
/// means the dependency answered, so it is bookkept like a success.
pub trait DependencyFailure {
    fn is_dependency_failure(&self) -> bool;
}

/// Circuit breaker state.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum CircuitState {
    /// Normal operation - calls are allowed.
    Closed,
    /// Dependency is failing - calls are rejected.
    Open,
    /// Testing recovery - one trial call is allowed.
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "Closed"),
            Self::Open => write!(f, "Open"),
            Self::HalfOpen => write!(f, "HalfOpen"),
        }
    }
}

/// Returned instead of calling the dependency while the circuit is open.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Circuit open for {dependency}, next trial in {retry_in:?}")]
pub struct CircuitOpenError {
    pub dependency: String,
    pub retry_in: Duration,
}

/// Outcome of [`CircuitBreaker::guarded_call`].
#[derive(Debug)]
pub enum CallOutcome<T, E> {
    /// The call was admitted and the work succeeded.
    Success(T),
    /// The call was admitted and the work failed with its own error.
    Failure(E),
    /// The circuit refused the call; the work never ran.
    Rejected(CircuitOpenError),
}

/// Circuit breaker configuration.
#[derive(Clone, Debug)]
pub struct CircuitBreakerConfig {
    /// Number of dependency failures before opening the circuit.
    pub max_failures: u32,
    /// Time the circuit stays open before admitting a trial call.
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            max_failures: DEFAULT_MAX_FAILURES,
            reset_timeout: DEFAULT_RESET_TIMEOUT,
        }
    }
}

/// Point-in-time view of the circuit.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitSnapshot {
    pub dependency: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub max_failures: u32,
    pub since_last_transition: Duration,
}

#[derive(Debug)]
struct Circuit {
    state: CircuitState,
    consecutive_failures: u32,
    /// When the circuit last entered Open.
    opened_at: Option<Instant>,
    last_transition: Instant,
}

impl Circuit {
    fn new(now: Instant) -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            last_transition: now,
        }
    }

    fn transition(&mut self, state: CircuitState, now: Instant) {
        self.state = state;
        self.last_transition = now;
        if state == CircuitState::Open {
            self.opened_at = Some(now);
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Admission {
    Normal,
    Trial,
}

/// Admission handed out by the breaker; must be settled with the call's outcome.
///
/// A trial permit dropped without being settled (the caller's future was
/// cancelled) counts as a failed trial so the circuit cannot stay HalfOpen
/// with no trial running.
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    admission: Admission,
    settled: bool,
}

impl Permit<'_> {
    fn succeed(mut self) {
        self.settled = true;
        self.breaker.record_success(self.admission);
    }

    fn fail(mut self) {
        self.settled = true;
        self.breaker.record_failure(self.admission);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.admission == Admission::Trial {
            warn!(
                "Circuit breaker: trial call for '{}' abandoned, treating as failure",
                self.breaker.dependency
            );
            self.breaker.record_failure(self.admission);
        }
    }
}

/// Circuit breaker guarding one dependency.
///
/// Thread-safe: every state decision happens under a single mutex, so two
/// callers can never both become the HalfOpen trial and concurrent failures
/// are never lost. The mutex is never held while the guarded work runs.
pub struct CircuitBreaker {
    dependency: String,
    circuit: Mutex<Circuit>,
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
}

impl CircuitBreaker {
    /// Create a circuit breaker with default settings.
    pub fn new(dependency: impl Into<String>) -> Self {
        Self::with_config(dependency, CircuitBreakerConfig::default())
    }

    /// Create a circuit breaker with custom configuration.
    pub fn with_config(dependency: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self::with_clock(dependency, config, Arc::new(SystemClock))
    }

    /// Create a circuit breaker reading time from `clock`.
    pub fn with_clock(
        dependency: impl Into<String>,
        config: CircuitBreakerConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let now = clock.now();
        Self {
            dependency: dependency.into(),
            circuit: Mutex::new(Circuit::new(now)),
            config,
            clock,
        }
    }

    pub fn dependency(&self) -> &str {
        &self.dependency
    }

    /// Lock the circuit mutex, recovering from poison if necessary.
    ///
    /// Every critical section leaves the circuit in a valid state before it
    /// can panic, so the inner value is safe to reuse.
    fn lock_circuit(&self) -> MutexGuard<'_, Circuit> {
        self.circuit.lock().unwrap_or_else(|poisoned| {
            warn!("Circuit breaker mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Decide whether a call may proceed.
    ///
    /// Handles the Open -> HalfOpen transition once `reset_timeout` has
    /// strictly elapsed; the caller that performs it becomes the trial.
    fn try_acquire(&self) -> Result<Permit<'_>, CircuitOpenError> {
        let now = self.clock.now();
        let mut circuit = self.lock_circuit();

        let admission = match circuit.state {
            CircuitState::Closed => Admission::Normal,
            CircuitState::HalfOpen => {
                // The trial slot is taken; whoever holds it decides the state.
                return Err(self.open_error(Duration::ZERO));
            }
            CircuitState::Open => {
                let opened_at = circuit.opened_at.unwrap_or(circuit.last_transition);
                let elapsed = now.saturating_duration_since(opened_at);
                if elapsed <= self.config.reset_timeout {
                    return Err(self.open_error(self.config.reset_timeout - elapsed));
                }
                info!(
                    "Circuit breaker: transitioning '{}' from Open to HalfOpen after {:?}",
                    self.dependency, elapsed
                );
                circuit.transition(CircuitState::HalfOpen, now);
                Admission::Trial
            }
        };

        Ok(Permit {
            breaker: self,
            admission,
            settled: false,
        })
    }

    fn open_error(&self, retry_in: Duration) -> CircuitOpenError {
        CircuitOpenError {
            dependency: self.dependency.clone(),
            retry_in,
        }
    }

    fn record_success(&self, admission: Admission) {
        let now = self.clock.now();
        let mut circuit = self.lock_circuit();

        match admission {
            Admission::Trial => {
                info!(
                    "Circuit breaker: trial for '{}' succeeded, closing circuit",
                    self.dependency
                );
                circuit.consecutive_failures = 0;
                circuit.opened_at = None;
                circuit.transition(CircuitState::Closed, now);
            }
            Admission::Normal => {
                debug!(
                    "Circuit breaker: success for '{}' ({} failures on record)",
                    self.dependency, circuit.consecutive_failures
                );
            }
        }
    }

    fn record_failure(&self, admission: Admission) {
        let now = self.clock.now();
        let mut circuit = self.lock_circuit();

        match admission {
            Admission::Trial => {
                info!(
                    "Circuit breaker: trial for '{}' failed, reopening circuit",
                    self.dependency
                );
                circuit.transition(CircuitState::Open, now);
            }
            Admission::Normal => {
                circuit.consecutive_failures = circuit.consecutive_failures.saturating_add(1);
                if circuit.state == CircuitState::Closed
                    && circuit.consecutive_failures >= self.config.max_failures
                {
                    info!(
                        "Circuit breaker: opening circuit for '{}' after {} failures",
                        self.dependency, circuit.consecutive_failures
                    );
                    circuit.transition(CircuitState::Open, now);
                } else {
                    debug!(
                        "Circuit breaker: failure for '{}' ({}/{})",
                        self.dependency, circuit.consecutive_failures, self.config.max_failures
                    );
                }
            }
        }
    }

    /// Run `work` if the circuit admits it.
    ///
    /// The work's own result is handed back untouched; the breaker only
    /// looks at it to update its bookkeeping.
    pub async fn guarded_call<F, Fut, T, E>(&self, work: F) -> CallOutcome<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: DependencyFailure,
    {
        let permit = match self.try_acquire() {
            Ok(permit) => permit,
            Err(open) => {
                debug!("Circuit breaker: rejected call to '{}'", self.dependency);
                return CallOutcome::Rejected(open);
            }
        };

        match work().await {
            Ok(value) => {
                permit.succeed();
                CallOutcome::Success(value)
            }
            Err(err) => {
                if err.is_dependency_failure() {
                    permit.fail();
                } else {
                    permit.succeed();
                }
                CallOutcome::Failure(err)
            }
        }
    }

    /// Get the current state.
    pub fn state(&self) -> CircuitState {
        self.lock_circuit().state
    }

    /// Get the consecutive failure count.
    pub fn failure_count(&self) -> u32 {
        self.lock_circuit().consecutive_failures
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let now = self.clock.now();
        let circuit = self.lock_circuit();
        CircuitSnapshot {
            dependency: self.dependency.clone(),
            state: circuit.state,
            consecutive_failures: circuit.consecutive_failures,
            max_failures: self.config.max_failures,
            since_last_transition: now.saturating_duration_since(circuit.last_transition),
        }
    }
}
