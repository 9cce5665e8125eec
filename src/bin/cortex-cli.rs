use clap::{Parser, Subcommand};
use reqwest::Method;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "cortex-cli")]
#[command(about = "Management CLI for the Cortex bootstrap service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trigger a bootstrap run
    Bootstrap,
    /// Show the last bootstrap result
    Status,
    /// Liveness check
    Health,
    /// Probe every dependency
    Deep,
    /// Readiness check
    Ready,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let (method, path) = match cli.command {
        Commands::Bootstrap => (Method::POST, "/api/v1/bootstrap"),
        Commands::Status => (Method::GET, "/api/v1/bootstrap"),
        Commands::Health => (Method::GET, "/health"),
        Commands::Deep => (Method::GET, "/health/deep"),
        Commands::Ready => (Method::GET, "/ready"),
    };

    let res = client
        .request(method, format!("{}{}", base, path))
        .send()
        .await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Cortex API returned status {}", status);
    }

    let text = res.text().await?;
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }

    if !status.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
