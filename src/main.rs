//! Cortex service binary.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!   POST /api/v1/     │                   CORTEX                     │
//!   bootstrap ────────┼─▶ http ──▶ Orchestrator ──┬──▶ postgres ─────┼──▶ arc-oracle
//!                     │              │            ├──▶ nats ─────────┼──▶ arc-flash
//!   GET /health/deep ─┼─▶ http ──────┘            ├──▶ pulsar ───────┼──▶ arc-strange
//!                     │                           └──▶ redis ────────┼──▶ arc-sonic
//!   GET /ready ───────┼─▶ last result                 (one circuit    │
//!                     │                                breaker each)  │
//!                     │  config · observability · lifecycle           │
//!                     └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use cortex::bootstrap::BootstrapStatus;
use cortex::config::load_config;
use cortex::lifecycle::startup;
use cortex::observability::logging::init_logging;
use cortex::resilience::BoxError;

#[derive(Parser)]
#[command(name = "cortex")]
#[command(about = "Infrastructure bootstrap and health service", long_about = None)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured log level
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the bootstrap and health API (default)
    Server,
    /// Run one bootstrap, print the result and exit
    Bootstrap,
}

#[tokio::main]
async fn main() -> Result<ExitCode, BoxError> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }
    init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.server.bind_address,
        "cortex starting"
    );

    match cli.command.unwrap_or(Commands::Server) {
        Commands::Server => {
            startup::run_server(config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Bootstrap => {
            let result = startup::run_once(&config).await?;
            println!("{}", serde_json::to_string_pretty(&*result)?);
            if result.status == BootstrapStatus::Error {
                tracing::error!("Bootstrap completed with errors");
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
