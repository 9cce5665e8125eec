//! HTTP API subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware: request ID, trace, panic, timeout)
//!     → handlers.rs (bootstrap trigger/status, health, deep health, ready)
//!     → Orchestrator
//!     → JSON response, status derived from orchestrator state
//! ```

pub mod handlers;
pub mod server;

pub use server::{AppState, HttpServer};
