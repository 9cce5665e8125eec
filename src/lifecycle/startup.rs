//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the four adapters and the orchestrator from configuration
//! - Start the metrics exporter when enabled
//! - Bind the API listener and serve until shutdown
//! - Run a single bootstrap for the one-shot command

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::adapters::{JetStreamProvisioner, PostgresProber, PulsarProvisioner, RedisProber};
use crate::bootstrap::{Adapters, BootstrapResult, Dependency, Orchestrator};
use crate::config::{BootstrapConfig, CortexConfig};
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;
use crate::resilience::{BoxError, Deadline};

/// Error type for process startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("postgres settings: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("redis settings: {0}")]
    Redis(#[source] BoxError),

    #[error("binding {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Dependencies whose phase is reported as skipped.
pub fn skipped_dependencies(config: &BootstrapConfig) -> Vec<Dependency> {
    config
        .skip
        .iter()
        .filter_map(|name| Dependency::from_name(name))
        .collect()
}

/// Build the orchestrator and its adapters. Nothing is dialled here.
pub fn build_orchestrator(config: &CortexConfig) -> Result<Arc<Orchestrator>, StartupError> {
    let bootstrap = &config.bootstrap;

    let adapters = Adapters {
        postgres: Arc::new(PostgresProber::new(&bootstrap.postgres)?),
        nats: Arc::new(JetStreamProvisioner::new(bootstrap.nats.url.clone())),
        pulsar: Arc::new(PulsarProvisioner::new(&bootstrap.pulsar)),
        redis: Arc::new(RedisProber::new(&bootstrap.redis).map_err(StartupError::Redis)?),
    };

    let skip = skipped_dependencies(bootstrap);
    if !skip.is_empty() {
        tracing::info!(skip = ?skip, "Bootstrap phases will be skipped");
    }

    Ok(Arc::new(Orchestrator::new(adapters, skip)))
}

fn start_metrics(config: &CortexConfig) {
    if !config.observability.metrics_enabled {
        return;
    }
    match config.observability.metrics_address.parse::<SocketAddr>() {
        Ok(addr) => metrics::init_metrics(addr),
        Err(e) => tracing::error!(
            metrics_address = %config.observability.metrics_address,
            error = %e,
            "Failed to parse metrics address"
        ),
    }
}

/// Serve the HTTP API until SIGINT or SIGTERM.
pub async fn run_server(config: CortexConfig) -> Result<(), StartupError> {
    start_metrics(&config);

    let orchestrator = build_orchestrator(&config)?;
    let server = HttpServer::new(
        &config.server,
        Duration::from_secs(config.bootstrap.timeout_secs),
        orchestrator,
    );

    let address = config.server.bind_address.clone();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    let signal_task = tokio::spawn(async move {
        signals::shutdown_on_signal(&shutdown).await;
    });

    let outcome = server.run(listener, receiver).await;
    signal_task.abort();
    outcome.map_err(StartupError::Serve)?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Run one bootstrap with the configured deadline and return its result.
pub async fn run_once(config: &CortexConfig) -> Result<Arc<BootstrapResult>, BoxError> {
    let orchestrator = build_orchestrator(config)?;
    let deadline = Deadline::after(Duration::from_secs(config.bootstrap.timeout_secs));
    Ok(orchestrator.run_bootstrap(deadline).await?)
}
