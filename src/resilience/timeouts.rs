//! Deadline enforcement.
//!
//! # Responsibilities
//! - Carry the caller's deadline into every adapter call
//! - Bound each network step (connect, request, reply) by that deadline
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - An expired deadline becomes a boxed error like any other failure

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

/// Error type used at the connection seams of the dependency adapters.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Returned when a step did not finish before the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deadline exceeded")]
pub struct DeadlineExceeded;

/// Optional point in time after which pending network steps are abandoned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// No deadline: steps may block for as long as the dependency takes.
    pub fn none() -> Self {
        Self { at: None }
    }

    /// Deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Some(Instant::now() + timeout),
        }
    }

    /// Time left before expiry, `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.remaining() == Some(Duration::ZERO)
    }

    /// Run `fut` to completion or until the deadline passes.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, DeadlineExceeded> {
        match self.at {
            None => Ok(fut.await),
            Some(at) => tokio::time::timeout_at(at, fut)
                .await
                .map_err(|_| DeadlineExceeded),
        }
    }

    /// Run a fallible step, folding expiry and the step's own error into one.
    pub async fn try_run<F, T, E>(&self, fut: F) -> Result<T, BoxError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
    {
        match self.run(fut).await {
            Ok(outcome) => outcome.map_err(Into::into),
            Err(expired) => Err(Box::new(expired)),
        }
    }
}
