//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{CortexConfig, LogFormat};
use crate::config::validation::{validate_config, ValidationError};

/// Prefix of environment variables that override file values.
pub const ENV_PREFIX: &str = "CORTEX_";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("environment variable {key}: {reason}")]
    Env { key: String, reason: String },

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: defaults, then the optional TOML file, then
/// `CORTEX_*` environment overrides, then validation.
pub fn load_config(path: Option<&Path>) -> Result<CortexConfig, ConfigError> {
    load_config_from(path, std::env::vars())
}

/// Same as [`load_config`] with an explicit environment.
pub fn load_config_from<I>(path: Option<&Path>, vars: I) -> Result<CortexConfig, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut config = match path {
        Some(path) => read_file(path)?,
        None => CortexConfig::default(),
    };

    apply_env_overrides(&mut config, vars)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn read_file(path: &Path) -> Result<CortexConfig, ConfigError> {
    let display = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: display.clone(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: display,
        source,
    })
}

/// Overlay `CORTEX_<SECTION>_<FIELD>` variables. Unknown `CORTEX_` keys are
/// ignored; malformed values are errors.
pub fn apply_env_overrides<I>(config: &mut CortexConfig, vars: I) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        let Some(name) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };

        let server = &mut config.server;
        let observability = &mut config.observability;
        let bootstrap = &mut config.bootstrap;
        match name {
            "SERVER_BIND_ADDRESS" => server.bind_address = value,
            "SERVER_REQUEST_TIMEOUT_SECS" => server.request_timeout_secs = parse(&key, &value)?,
            "SERVER_DEEP_HEALTH_TIMEOUT_SECS" => {
                server.deep_health_timeout_secs = parse(&key, &value)?
            }
            "SERVER_SHUTDOWN_TIMEOUT_SECS" => server.shutdown_timeout_secs = parse(&key, &value)?,

            "OBSERVABILITY_LOG_LEVEL" => observability.log_level = value,
            "OBSERVABILITY_LOG_FORMAT" => {
                observability.log_format = match value.to_ascii_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    other => {
                        return Err(ConfigError::Env {
                            key: key.clone(),
                            reason: format!("unknown log format '{}'", other),
                        })
                    }
                }
            }
            "OBSERVABILITY_METRICS_ENABLED" => observability.metrics_enabled = parse(&key, &value)?,
            "OBSERVABILITY_METRICS_ADDRESS" => observability.metrics_address = value,

            "BOOTSTRAP_TIMEOUT_SECS" => bootstrap.timeout_secs = parse(&key, &value)?,
            "BOOTSTRAP_SKIP" => {
                bootstrap.skip = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            }

            "BOOTSTRAP_POSTGRES_HOST" => bootstrap.postgres.host = value,
            "BOOTSTRAP_POSTGRES_PORT" => bootstrap.postgres.port = parse(&key, &value)?,
            "BOOTSTRAP_POSTGRES_USER" => bootstrap.postgres.user = value,
            "BOOTSTRAP_POSTGRES_PASSWORD" => bootstrap.postgres.password = value,
            "BOOTSTRAP_POSTGRES_DATABASE" => bootstrap.postgres.database = value,
            "BOOTSTRAP_POSTGRES_SSL_MODE" => bootstrap.postgres.ssl_mode = value,

            "BOOTSTRAP_NATS_URL" => bootstrap.nats.url = value,

            "BOOTSTRAP_PULSAR_ADMIN_URL" => bootstrap.pulsar.admin_url = value,
            "BOOTSTRAP_PULSAR_TENANT" => bootstrap.pulsar.tenant = value,
            "BOOTSTRAP_PULSAR_ALLOWED_CLUSTERS" => {
                bootstrap.pulsar.allowed_clusters = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            }

            "BOOTSTRAP_REDIS_HOST" => bootstrap.redis.host = value,
            "BOOTSTRAP_REDIS_PORT" => bootstrap.redis.port = parse(&key, &value)?,
            "BOOTSTRAP_REDIS_PASSWORD" => bootstrap.redis.password = value,
            "BOOTSTRAP_REDIS_DB" => bootstrap.redis.db = parse(&key, &value)?,

            _ => {}
        }
    }
    Ok(())
}

fn parse<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Env {
        key: key.to_string(),
        reason: format!("invalid value '{}': {}", value, e),
    })
}
