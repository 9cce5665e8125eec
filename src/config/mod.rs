//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, overlay CORTEX_* env vars)
//!     → validation.rs (semantic checks)
//!     → CortexConfig (validated, immutable)
//!     → startup wiring builds adapters and server from it
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BootstrapConfig, CortexConfig, LogFormat, NatsConfig, ObservabilityConfig, PostgresConfig,
    PulsarConfig, RedisConfig, ServerConfig,
};
