//! Cortex: infrastructure bootstrap and health service.
//!
//! Provisions and health-checks the platform's relational store, stream
//! system, topic broker and cache, and exposes the aggregate outcome so other
//! components can gate readiness on it.

// Core
pub mod adapters;
pub mod bootstrap;
pub mod http;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use bootstrap::{BootstrapResult, Orchestrator};
pub use config::CortexConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
