//! Circuit breaker for dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: testing if dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= threshold (3)
//! Open → Half-Open: after cool-down (30s)
//! Half-Open → Closed: trial call succeeds
//! Half-Open → Open: trial call fails (cool-down restarts)
//! ```
//!
//! # Design Decisions
//! - Per-dependency circuit breaker (not global)
//! - Fail fast in Open state (no waiting for timeout)
//! - Single trial in flight while Half-Open
//! - Outcomes from a previous generation are ignored

use std::fmt;
use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::time::Instant;

use crate::observability::metrics;

/// Consecutive failures that trip a breaker.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// Time an open breaker rejects calls before admitting a trial.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

/// Breaker state as observed by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half-open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by [`CircuitBreaker::execute`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BreakerError<E> {
    /// The breaker rejected the call without running it.
    #[error("circuit open")]
    Open,

    /// The wrapped operation ran and failed.
    #[error("{0}")]
    Inner(E),
}

/// Trip and recovery settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerPolicy {
    pub failure_threshold: u32,
    pub cooldown: Duration,
}

impl Default for BreakerPolicy {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
    generation: u64,
}

/// Admission ticket for one call.
#[derive(Debug, Clone, Copy)]
struct Ticket {
    generation: u64,
    trial: bool,
}

/// Failure-isolation wrapper around calls to one external dependency.
///
/// Safe to share between tasks; all transitions happen under one lock that is
/// never held across an await point.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    policy: BreakerPolicy,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Breaker with the default policy (3 failures, 30s cool-down).
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_policy(name, BreakerPolicy::default())
    }

    pub fn with_policy(name: impl Into<String>, policy: BreakerPolicy) -> Self {
        let name = name.into();
        metrics::record_circuit_state(&name, CircuitState::Closed);
        Self {
            name,
            policy,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_in_flight: false,
                generation: 0,
            }),
        }
    }

    /// Current state. An open breaker whose cool-down has elapsed reports
    /// Half-Open even before the trial call arrives.
    pub fn state(&self) -> CircuitState {
        let inner = self.inner.lock();
        match inner.state {
            CircuitState::Open if self.cooldown_elapsed(&inner, Instant::now()) => {
                CircuitState::HalfOpen
            }
            state => state,
        }
    }

    /// Consecutive failures recorded while Closed.
    pub fn consecutive_failures(&self) -> u32 {
        self.inner.lock().consecutive_failures
    }

    /// Run `operation` through the breaker.
    ///
    /// When the breaker rejects the call, `operation` is never invoked and
    /// [`BreakerError::Open`] is returned.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let ticket = self.admit().ok_or(BreakerError::Open)?;
        let mut permit = Permit {
            breaker: self,
            ticket,
            settled: false,
        };

        let outcome = operation().await;
        permit.settle(outcome.is_ok());
        outcome.map_err(BreakerError::Inner)
    }

    fn admit(&self) -> Option<Ticket> {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        match inner.state {
            CircuitState::Closed => Some(Ticket {
                generation: inner.generation,
                trial: false,
            }),
            CircuitState::Open => {
                if !self.cooldown_elapsed(&inner, now) {
                    return None;
                }
                self.transition(&mut inner, CircuitState::HalfOpen, now);
                inner.trial_in_flight = true;
                Some(Ticket {
                    generation: inner.generation,
                    trial: true,
                })
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    return None;
                }
                inner.trial_in_flight = true;
                Some(Ticket {
                    generation: inner.generation,
                    trial: true,
                })
            }
        }
    }

    fn on_success(&self, ticket: Ticket) {
        let mut inner = self.inner.lock();
        if inner.generation != ticket.generation {
            return;
        }
        match inner.state {
            CircuitState::Closed => inner.consecutive_failures = 0,
            CircuitState::HalfOpen => {
                self.transition(&mut inner, CircuitState::Closed, Instant::now());
            }
            CircuitState::Open => {}
        }
    }

    fn on_failure(&self, ticket: Ticket) {
        let mut inner = self.inner.lock();
        if inner.generation != ticket.generation {
            return;
        }
        let now = Instant::now();
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.policy.failure_threshold {
                    self.transition(&mut inner, CircuitState::Open, now);
                }
            }
            CircuitState::HalfOpen => self.transition(&mut inner, CircuitState::Open, now),
            CircuitState::Open => {}
        }
    }

    /// A trial that was dropped before completing frees the trial slot so the
    /// next caller can try again.
    fn on_abandoned(&self, ticket: Ticket) {
        if !ticket.trial {
            return;
        }
        let mut inner = self.inner.lock();
        if inner.generation == ticket.generation {
            inner.trial_in_flight = false;
        }
    }

    fn transition(&self, inner: &mut BreakerInner, to: CircuitState, now: Instant) {
        let from = inner.state;
        inner.state = to;
        inner.generation = inner.generation.wrapping_add(1);
        inner.trial_in_flight = false;
        match to {
            CircuitState::Open => {
                inner.opened_at = Some(now);
                tracing::warn!(
                    breaker = %self.name,
                    from = %from,
                    failures = inner.consecutive_failures,
                    cooldown_secs = self.policy.cooldown.as_secs(),
                    "Circuit opened"
                );
            }
            CircuitState::HalfOpen => {
                tracing::info!(breaker = %self.name, "Circuit half-open, admitting trial call");
            }
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
                inner.opened_at = None;
                tracing::info!(breaker = %self.name, from = %from, "Circuit closed");
            }
        }
        metrics::record_circuit_state(&self.name, to);
    }

    fn cooldown_elapsed(&self, inner: &BreakerInner, now: Instant) -> bool {
        inner
            .opened_at
            .map(|at| now.saturating_duration_since(at) >= self.policy.cooldown)
            .unwrap_or(true)
    }
}

/// Records the outcome of an admitted call, or releases a trial slot if the
/// call future is dropped first.
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    ticket: Ticket,
    settled: bool,
}

impl Permit<'_> {
    fn settle(&mut self, success: bool) {
        self.settled = true;
        if success {
            self.breaker.on_success(self.ticket);
        } else {
            self.breaker.on_failure(self.ticket);
        }
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.on_abandoned(self.ticket);
        }
    }
}
