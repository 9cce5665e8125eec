//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and URLs the adapters will dial
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Check skip entries name known dependencies
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: CortexConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::str::FromStr;

use sqlx::postgres::PgSslMode;
use thiserror::Error;
use url::Url;

use crate::bootstrap::Dependency;
use crate::config::schema::CortexConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: invalid URL '{value}': {reason}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("{field}: must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field}: must not be empty")]
    Empty { field: &'static str },

    #[error("observability.log_level: unknown level '{0}'")]
    UnknownLogLevel(String),

    #[error("bootstrap.skip: unknown dependency '{0}'")]
    UnknownDependency(String),

    #[error("bootstrap.postgres.ssl_mode: unknown mode '{0}'")]
    UnknownSslMode(String),

    #[error("bootstrap.pulsar.tenant: '{0}' may only contain letters, digits, '_', '-' and '.'")]
    InvalidTenant(String),

    #[error("{field}: must not be negative")]
    Negative { field: &'static str },
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &CortexConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "server.bind_address",
            value: config.server.bind_address.clone(),
        });
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "server.request_timeout_secs",
        });
    }
    if config.server.deep_health_timeout_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "server.deep_health_timeout_secs",
        });
    }
    if config.server.shutdown_timeout_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "server.shutdown_timeout_secs",
        });
    }

    let observability = &config.observability;
    if !LOG_LEVELS.contains(&observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::UnknownLogLevel(observability.log_level.clone()));
    }
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: observability.metrics_address.clone(),
        });
    }

    let bootstrap = &config.bootstrap;
    if bootstrap.timeout_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "bootstrap.timeout_secs",
        });
    }
    for name in &bootstrap.skip {
        if Dependency::from_name(name).is_none() {
            errors.push(ValidationError::UnknownDependency(name.clone()));
        }
    }

    if bootstrap.postgres.host.trim().is_empty() {
        errors.push(ValidationError::Empty {
            field: "bootstrap.postgres.host",
        });
    }
    if bootstrap.postgres.port == 0 {
        errors.push(ValidationError::Zero {
            field: "bootstrap.postgres.port",
        });
    }
    if bootstrap.postgres.database.trim().is_empty() {
        errors.push(ValidationError::Empty {
            field: "bootstrap.postgres.database",
        });
    }
    if PgSslMode::from_str(&bootstrap.postgres.ssl_mode).is_err() {
        errors.push(ValidationError::UnknownSslMode(
            bootstrap.postgres.ssl_mode.clone(),
        ));
    }

    check_url(
        &mut errors,
        "bootstrap.nats.url",
        &bootstrap.nats.url,
        &["nats", "tls", "ws", "wss"],
    );
    check_url(
        &mut errors,
        "bootstrap.pulsar.admin_url",
        &bootstrap.pulsar.admin_url,
        &["http", "https"],
    );
    let tenant = &bootstrap.pulsar.tenant;
    if tenant.trim().is_empty() {
        errors.push(ValidationError::Empty {
            field: "bootstrap.pulsar.tenant",
        });
    } else if !is_path_safe(tenant) {
        errors.push(ValidationError::InvalidTenant(tenant.clone()));
    }
    if bootstrap.pulsar.allowed_clusters.is_empty() {
        errors.push(ValidationError::Empty {
            field: "bootstrap.pulsar.allowed_clusters",
        });
    }

    if bootstrap.redis.host.trim().is_empty() {
        errors.push(ValidationError::Empty {
            field: "bootstrap.redis.host",
        });
    }
    if bootstrap.redis.port == 0 {
        errors.push(ValidationError::Zero {
            field: "bootstrap.redis.port",
        });
    }
    if bootstrap.redis.db < 0 {
        errors.push(ValidationError::Negative {
            field: "bootstrap.redis.db",
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Tenant names are used verbatim as admin URL path segments.
fn is_path_safe(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && name != "."
        && name != ".."
}

fn check_url(
    errors: &mut Vec<ValidationError>,
    field: &'static str,
    value: &str,
    schemes: &[&str],
) {
    match Url::parse(value) {
        Ok(url) if schemes.contains(&url.scheme()) => {}
        Ok(url) => errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        }),
        Err(e) => errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&CortexConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = CortexConfig::default();
        config.server.bind_address = "not-an-address".into();
        config.bootstrap.timeout_secs = 0;
        config.bootstrap.skip = vec!["pulsar".into(), "kafka".into()];
        config.bootstrap.pulsar.admin_url = "ftp://arc-strange".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4, "got {:?}", errors);
        assert!(errors.contains(&ValidationError::UnknownDependency("kafka".into())));
        assert!(errors
            .iter()
            .any(|e| e.to_string().contains("unsupported scheme 'ftp'")));
    }

    #[test]
    fn test_metrics_address_only_checked_when_enabled() {
        let mut config = CortexConfig::default();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_ssl_modes() {
        let mut config = CortexConfig::default();
        for mode in ["disable", "prefer", "require", "verify-ca", "verify-full"] {
            config.bootstrap.postgres.ssl_mode = mode.into();
            assert_eq!(validate_config(&config), Ok(()), "mode {}", mode);
        }

        config.bootstrap.postgres.ssl_mode = "sometimes".into();
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::UnknownSslMode("sometimes".into())])
        );
    }

    #[test]
    fn test_tenant_must_be_a_single_path_segment() {
        let mut config = CortexConfig::default();
        config.bootstrap.pulsar.tenant = "acme_prod-1.eu".into();
        assert_eq!(validate_config(&config), Ok(()));

        for tenant in ["acme/other", "a b", "..", "t?x=1", "caf\u{e9}"] {
            config.bootstrap.pulsar.tenant = tenant.into();
            assert_eq!(
                validate_config(&config),
                Err(vec![ValidationError::InvalidTenant(tenant.into())]),
                "tenant {:?}",
                tenant
            );
        }
    }

    #[test]
    fn test_negative_redis_db_is_reported_with_other_errors() {
        let mut config = CortexConfig::default();
        config.bootstrap.redis.db = -1;
        config.server.shutdown_timeout_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::Zero {
                    field: "server.shutdown_timeout_secs"
                },
                ValidationError::Negative {
                    field: "bootstrap.redis.db"
                },
            ]
        );
        assert_eq!(errors[1].to_string(), "bootstrap.redis.db: must not be negative");
    }
}
