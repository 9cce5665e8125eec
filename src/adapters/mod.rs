//! Dependency adapters.
//!
//! # Data Flow
//! ```text
//! Orchestrator phase / probe
//!     → adapter (one per dependency, owns one CircuitBreaker)
//!     → breaker.execute(work)
//!     → connection seam (opened per call, dropped before return)
//!     → Result → ProbeResult / ProvisionError
//! ```
//!
//! # Design Decisions
//! - No persistent connections; every call dials and releases its own
//! - Each network step is bounded by the caller's Deadline
//! - Connection seams are traits so tests substitute in-memory fakes
//! - Breaker rejections surface as the fixed text "circuit open"

pub mod nats;
pub mod postgres;
pub mod pulsar;
pub mod redis;

pub use nats::{JetStreamProvisioner, StreamError, StreamSpec, REQUIRED_STREAMS};
pub use postgres::{PostgresError, PostgresProber};
pub use pulsar::{PulsarProvisioner, TopicError, TopicSpec, REQUIRED_NAMESPACES, REQUIRED_TOPICS};
pub use redis::{CacheError, RedisProber};

use std::fmt::Display;
use std::time::Instant;

use thiserror::Error;

use crate::bootstrap::{Dependency, ProbeResult};
use crate::observability::metrics;
use crate::resilience::BreakerError;

/// Failure of a provisioning call.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("circuit open")]
    CircuitOpen,

    #[error(transparent)]
    Streams(#[from] StreamError),

    #[error(transparent)]
    Topics(#[from] TopicError),
}

impl<E: Into<ProvisionError>> From<BreakerError<E>> for ProvisionError {
    fn from(err: BreakerError<E>) -> Self {
        match err {
            BreakerError::Open => ProvisionError::CircuitOpen,
            BreakerError::Inner(e) => e.into(),
        }
    }
}

/// Convert a breaker-wrapped probe outcome into a result, recording metrics.
pub(crate) fn finish_probe<E: Display>(
    dependency: Dependency,
    started: Instant,
    outcome: Result<(), BreakerError<E>>,
) -> ProbeResult {
    let elapsed = started.elapsed();
    metrics::record_probe(dependency.name(), outcome.is_ok(), elapsed);

    match outcome {
        Ok(()) => ProbeResult::healthy(dependency.probe_name(), elapsed),
        Err(e) => {
            tracing::debug!(dependency = %dependency, error = %e, "Probe failed");
            ProbeResult::unhealthy(dependency.probe_name(), elapsed, e.to_string())
        }
    }
}
