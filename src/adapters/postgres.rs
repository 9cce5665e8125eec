//! Relational store prober.
//!
//! Connects, pings, then checks for the migrations marker table. A reachable
//! but unmigrated database reports a different error than an unreachable one.

use std::str::FromStr;
use std::time::Instant;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgSslMode};
use sqlx::Connection;
use thiserror::Error;

use crate::adapters::finish_probe;
use crate::bootstrap::{Dependency, ProbeResult, RelationalProbe};
use crate::config::PostgresConfig;
use crate::resilience::{BoxError, CircuitBreaker, Deadline};

const MARKER_SCHEMA: &str = "public";
const MARKER_TABLE: &str = "schema_migrations";

/// Error type for relational store probes.
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("connecting to postgres: {0}")]
    Connect(#[source] BoxError),

    #[error("ping: {0}")]
    Ping(#[source] BoxError),

    #[error("schema_migrations table not found: {0}")]
    Schema(#[source] BoxError),

    #[error("schema_migrations table not found")]
    NotMigrated,
}

/// Opens one session against the relational store.
#[async_trait]
pub trait SqlConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn SqlSession>, BoxError>;
}

/// Queries the probe needs on an open session.
#[async_trait]
pub trait SqlSession: Send {
    async fn ping(&mut self) -> Result<(), BoxError>;

    async fn table_exists(&mut self, schema: &str, table: &str) -> Result<bool, BoxError>;

    async fn close(self: Box<Self>);
}

/// Connector backed by a single `sqlx` Postgres connection.
pub struct PgConnector {
    options: PgConnectOptions,
}

impl PgConnector {
    pub fn new(config: &PostgresConfig) -> Result<Self, sqlx::Error> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database)
            .ssl_mode(PgSslMode::from_str(&config.ssl_mode)?);
        Ok(Self { options })
    }
}

struct PgSession {
    conn: PgConnection,
}

#[async_trait]
impl SqlConnector for PgConnector {
    async fn connect(&self) -> Result<Box<dyn SqlSession>, BoxError> {
        let conn = PgConnection::connect_with(&self.options).await?;
        Ok(Box::new(PgSession { conn }))
    }
}

#[async_trait]
impl SqlSession for PgSession {
    async fn ping(&mut self) -> Result<(), BoxError> {
        self.conn.ping().await?;
        Ok(())
    }

    async fn table_exists(&mut self, schema: &str, table: &str) -> Result<bool, BoxError> {
        let row: Option<i32> = sqlx::query_scalar(
            "SELECT 1 FROM information_schema.tables WHERE table_schema = $1 AND table_name = $2",
        )
        .bind(schema)
        .bind(table)
        .fetch_optional(&mut self.conn)
        .await?;
        Ok(row.is_some())
    }

    async fn close(self: Box<Self>) {
        let PgSession { conn } = *self;
        if let Err(e) = conn.close().await {
            tracing::debug!(error = %e, "Closing postgres connection failed");
        }
    }
}

/// Probes the relational store through a circuit breaker.
pub struct PostgresProber {
    connector: Box<dyn SqlConnector>,
    breaker: CircuitBreaker,
}

impl PostgresProber {
    pub fn new(config: &PostgresConfig) -> Result<Self, sqlx::Error> {
        Ok(Self::with_connector(Box::new(PgConnector::new(config)?)))
    }

    pub fn with_connector(connector: Box<dyn SqlConnector>) -> Self {
        Self {
            connector,
            breaker: CircuitBreaker::new(Dependency::Postgres.name()),
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    async fn check(&self, deadline: Deadline) -> Result<(), PostgresError> {
        let mut session = deadline
            .try_run(self.connector.connect())
            .await
            .map_err(PostgresError::Connect)?;

        let outcome = Self::verify(session.as_mut(), deadline).await;
        session.close().await;
        outcome
    }

    async fn verify(session: &mut dyn SqlSession, deadline: Deadline) -> Result<(), PostgresError> {
        deadline
            .try_run(session.ping())
            .await
            .map_err(PostgresError::Ping)?;

        let exists = deadline
            .try_run(session.table_exists(MARKER_SCHEMA, MARKER_TABLE))
            .await
            .map_err(PostgresError::Schema)?;
        if exists {
            Ok(())
        } else {
            Err(PostgresError::NotMigrated)
        }
    }
}

#[async_trait]
impl RelationalProbe for PostgresProber {
    async fn probe(&self, deadline: Deadline) -> ProbeResult {
        let started = Instant::now();
        let outcome = self.breaker.execute(|| self.check(deadline)).await;
        finish_probe(Dependency::Postgres, started, outcome)
    }
}
