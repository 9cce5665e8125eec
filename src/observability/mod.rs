//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Orchestrator, adapters and breakers produce:
//!     → logging.rs (structured log events, one span per bootstrap run)
//!     → metrics.rs (phase/probe counters, latency histograms, breaker state)
//!
//! Consumers:
//!     → Log aggregation (stdout, JSON by default)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Metric calls are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
