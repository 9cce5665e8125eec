//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for Cortex.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct CortexConfig {
    /// HTTP API settings.
    pub server: ServerConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Bootstrap run settings and per-dependency connection details.
    pub bootstrap: BootstrapConfig,
}

/// HTTP API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8081").
    pub bind_address: String,

    /// Total time allowed for one API request in seconds.
    pub request_timeout_secs: u64,

    /// Deadline handed to the probes of one deep-health request in seconds.
    pub deep_health_timeout_secs: u64,

    /// Upper bound on draining in-flight requests after shutdown, in seconds.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8081".to_string(),
            request_timeout_secs: 30,
            deep_health_timeout_secs: 10,
            shutdown_timeout_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Bootstrap configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Deadline for one bootstrap run in seconds.
    pub timeout_secs: u64,

    /// Dependency names whose bootstrap phase is reported as skipped.
    pub skip: Vec<String>,

    pub postgres: PostgresConfig,
    pub nats: NatsConfig,
    pub pulsar: PulsarConfig,
    pub redis: RedisConfig,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            skip: Vec::new(),
            postgres: PostgresConfig::default(),
            nats: NatsConfig::default(),
            pulsar: PulsarConfig::default(),
            redis: RedisConfig::default(),
        }
    }
}

/// Relational store connection settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,

    /// libpq-style SSL mode (disable, prefer, require, ...).
    pub ssl_mode: String,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "arc-oracle".to_string(),
            port: 5432,
            user: "arc".to_string(),
            password: String::new(),
            database: "arc_db".to_string(),
            ssl_mode: "disable".to_string(),
        }
    }
}

/// Stream system connection settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct NatsConfig {
    /// Server URL (e.g., "nats://arc-flash:4222").
    pub url: String,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://arc-flash:4222".to_string(),
        }
    }
}

/// Topic broker admin settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PulsarConfig {
    /// Admin REST base URL.
    pub admin_url: String,

    /// Tenant that owns the provisioned namespaces.
    pub tenant: String,

    /// Clusters the tenant is allowed on.
    pub allowed_clusters: Vec<String>,
}

impl Default for PulsarConfig {
    fn default() -> Self {
        Self {
            admin_url: "http://arc-strange:8080".to_string(),
            tenant: "arc-system".to_string(),
            allowed_clusters: vec!["standalone".to_string()],
        }
    }
}

/// Cache connection settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: String,
    pub db: i64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "arc-sonic".to_string(),
            port: 6379,
            password: String::new(),
            db: 0,
        }
    }
}
