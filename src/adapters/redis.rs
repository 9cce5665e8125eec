//! Cache prober.
//!
//! Sends PING and requires the exact reply "PONG".

use std::time::Instant;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::adapters::finish_probe;
use crate::bootstrap::{CacheProbe, Dependency, ProbeResult};
use crate::config::RedisConfig;
use crate::resilience::{BoxError, CircuitBreaker, Deadline};

const EXPECTED_REPLY: &str = "PONG";

/// Error type for cache probes.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("connecting to redis: {0}")]
    Connect(#[source] BoxError),

    #[error("ping: {0}")]
    Ping(#[source] BoxError),

    #[error("unexpected PING response: {0:?}")]
    UnexpectedReply(String),
}

/// Opens one session against the cache.
#[async_trait]
pub trait CacheConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn CacheSession>, BoxError>;
}

/// Liveness command on an open session.
#[async_trait]
pub trait CacheSession: Send {
    async fn ping(&mut self) -> Result<String, BoxError>;
}

/// Connector backed by a `redis` multiplexed connection.
pub struct RedisConnector {
    client: redis::Client,
}

impl RedisConnector {
    pub fn new(config: &RedisConfig) -> Result<Self, BoxError> {
        let url = connection_url(config)?;
        Ok(Self {
            client: redis::Client::open(url.as_str())?,
        })
    }
}

fn connection_url(config: &RedisConfig) -> Result<Url, BoxError> {
    let mut url = Url::parse(&format!(
        "redis://{}:{}/{}",
        config.host, config.port, config.db
    ))?;
    if !config.password.is_empty() {
        url.set_password(Some(&config.password))
            .map_err(|_| "redis URL cannot carry a password")?;
    }
    Ok(url)
}

struct RedisSession {
    conn: redis::aio::MultiplexedConnection,
}

#[async_trait]
impl CacheConnector for RedisConnector {
    async fn connect(&self) -> Result<Box<dyn CacheSession>, BoxError> {
        let conn = self.client.get_multiplexed_async_connection().await?;
        Ok(Box::new(RedisSession { conn }))
    }
}

#[async_trait]
impl CacheSession for RedisSession {
    async fn ping(&mut self) -> Result<String, BoxError> {
        let reply: String = redis::cmd("PING").query_async(&mut self.conn).await?;
        Ok(reply)
    }
}

/// Probes the cache through a circuit breaker.
pub struct RedisProber {
    connector: Box<dyn CacheConnector>,
    breaker: CircuitBreaker,
}

impl RedisProber {
    pub fn new(config: &RedisConfig) -> Result<Self, BoxError> {
        Ok(Self::with_connector(Box::new(RedisConnector::new(config)?)))
    }

    pub fn with_connector(connector: Box<dyn CacheConnector>) -> Self {
        Self {
            connector,
            breaker: CircuitBreaker::new(Dependency::Redis.name()),
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    async fn check(&self, deadline: Deadline) -> Result<(), CacheError> {
        let mut session = deadline
            .try_run(self.connector.connect())
            .await
            .map_err(CacheError::Connect)?;

        let reply = deadline
            .try_run(session.ping())
            .await
            .map_err(CacheError::Ping)?;
        if reply == EXPECTED_REPLY {
            Ok(())
        } else {
            Err(CacheError::UnexpectedReply(reply))
        }
    }
}

#[async_trait]
impl CacheProbe for RedisProber {
    async fn probe(&self, deadline: Deadline) -> ProbeResult {
        let started = Instant::now();
        let outcome = self.breaker.execute(|| self.check(deadline)).await;
        finish_probe(Dependency::Redis, started, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeCache {
        reply: Result<&'static str, &'static str>,
    }

    #[async_trait]
    impl CacheConnector for FakeCache {
        async fn connect(&self) -> Result<Box<dyn CacheSession>, BoxError> {
            Ok(Box::new(FakeCache { reply: self.reply }))
        }
    }

    #[async_trait]
    impl CacheSession for FakeCache {
        async fn ping(&mut self) -> Result<String, BoxError> {
            self.reply.map(str::to_string).map_err(Into::into)
        }
    }

    async fn probe(reply: Result<&'static str, &'static str>) -> ProbeResult {
        RedisProber::with_connector(Box::new(FakeCache { reply }))
            .probe(Deadline::none())
            .await
    }

    #[tokio::test]
    async fn test_pong_is_healthy() {
        let result = probe(Ok("PONG")).await;
        assert!(result.ok);
        assert_eq!(result.name, "arc-sonic");
        assert_eq!(result.error, None);
    }

    #[tokio::test]
    async fn test_unexpected_reply_is_unhealthy() {
        let result = probe(Ok("pong")).await;
        assert!(!result.ok);
        assert_eq!(
            result.error.as_deref(),
            Some("unexpected PING response: \"pong\"")
        );
    }

    #[tokio::test]
    async fn test_ping_error() {
        let result = probe(Err("connection refused")).await;
        assert_eq!(result.error.as_deref(), Some("ping: connection refused"));
    }

    #[test]
    fn test_connection_url() {
        let config = RedisConfig {
            password: "s3cret".into(),
            db: 2,
            ..RedisConfig::default()
        };
        assert_eq!(
            connection_url(&config).unwrap().as_str(),
            "redis://:s3cret@arc-sonic:6379/2"
        );
        assert_eq!(
            connection_url(&RedisConfig::default()).unwrap().as_str(),
            "redis://arc-sonic:6379/0"
        );
    }
}
