//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Adapter call against a dependency:
//!     → circuit_breaker.rs (admit, or fail fast with "circuit open")
//!     → timeouts.rs (bound every network step by the caller's deadline)
//!     → outcome recorded back into the breaker
//! ```
//!
//! # Design Decisions
//! - One breaker per dependency, shared by bootstrap and deep-health paths
//! - No retries inside a phase; a failure is surfaced once per attempt
//! - Deadline expiry is an ordinary failure, not a separate code path

pub mod circuit_breaker;
pub mod timeouts;

pub use circuit_breaker::{BreakerError, BreakerPolicy, CircuitBreaker, CircuitState};
pub use timeouts::{BoxError, Deadline, DeadlineExceeded};
