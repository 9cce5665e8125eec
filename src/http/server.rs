//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (timeout, request ID, tracing, panic recovery)
//! - Serve on a listener until the shutdown signal fires
//! - Bound the drain of in-flight requests after shutdown

use std::future::IntoFuture;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::bootstrap::Orchestrator;
use crate::config::ServerConfig;
use crate::http::handlers;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub bootstrap_timeout: Duration,
    pub deep_health_timeout: Duration,
}

/// HTTP server exposing the bootstrap and health API.
pub struct HttpServer {
    router: Router,
    shutdown_timeout: Duration,
}

impl HttpServer {
    /// Create a new HTTP server around an orchestrator.
    pub fn new(
        config: &ServerConfig,
        bootstrap_timeout: Duration,
        orchestrator: Arc<Orchestrator>,
    ) -> Self {
        let state = AppState {
            orchestrator,
            bootstrap_timeout,
            deep_health_timeout: Duration::from_secs(config.deep_health_timeout_secs),
        };
        let router = Self::build_router(
            state,
            Duration::from_secs(config.request_timeout_secs),
        );
        Self {
            router,
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout_secs),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(CatchPanicLayer::new())
            .layer(TimeoutLayer::new(request_timeout));

        Router::new()
            .route(
                "/api/v1/bootstrap",
                post(handlers::trigger_bootstrap).get(handlers::bootstrap_status),
            )
            .route("/health", get(handlers::health))
            .route("/health/deep", get(handlers::deep_health))
            .route("/ready", get(handlers::ready))
            .with_state(state)
            .layer(middleware)
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    ///
    /// Draining that outlasts the shutdown timeout abandons the remaining
    /// connections and returns `ErrorKind::TimedOut`.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let (draining_tx, draining_rx) = oneshot::channel();
        let serve = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
                let _ = draining_tx.send(());
            })
            .into_future();

        let drain_limit = self.shutdown_timeout;
        let expired = async move {
            match draining_rx.await {
                Ok(()) => tokio::time::sleep(drain_limit).await,
                Err(_) => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            result = serve => result?,
            _ = expired => {
                tracing::warn!(
                    timeout_secs = drain_limit.as_secs(),
                    "HTTP server drain timed out, dropping open connections"
                );
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "graceful shutdown timed out",
                ));
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
