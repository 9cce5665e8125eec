//! Bootstrap orchestration subsystem.
//!
//! # Data Flow
//! ```text
//! run_bootstrap(deadline)
//!     → try_acquire (CAS on the run flag, reject if held)
//!     → spawn one phase worker per dependency (skipped ones short-circuit)
//!     → workers send PhaseResult over an mpsc channel
//!     → collect all four → BootstrapResult (status derived)
//!     → publish as last result → release run flag
//!
//! run_deep_health(deadline)
//!     → spawn one probe per dependency → join_all → DeepHealthReport
//! ```
//!
//! # Design Decisions
//! - Workers never cancel each other; the join always waits for all four
//! - Results are aggregated by message passing, not a shared locked map
//! - The run flag is cleared by an RAII guard, so panics and cancellation release it
//! - Deep health ignores the run flag and may overlap a bootstrap
//! - Readiness is derived from the last completed result only

pub mod contracts;
pub mod orchestrator;
pub mod types;

pub use contracts::{CacheProbe, RelationalProbe, StreamProvisioning, TopicProvisioning};
pub use orchestrator::{Adapters, BootstrapError, Orchestrator};
pub use types::{
    BootstrapResult, BootstrapStatus, DeepHealthReport, Dependency, PhaseResult, PhaseStatus,
    ProbeResult,
};
