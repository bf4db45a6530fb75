use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use travelian::{GeminiClient, TravelianConfig, telemetry, web};

#[derive(Parser, Debug)]
#[command(name = "travelian", version, about = "AI-assisted travel planning backend")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "TRAVELIAN_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = TravelianConfig::load_from_path(cli.config)
        .and_then(|config| config.with_cli_overrides(cli.host, cli.port, cli.verbose))
        .context("Failed to load configuration")?;

    let telemetry = telemetry::init(&config.logging, &config.telemetry)?;

    info!(version = travelian::VERSION, "Starting Travelian");
    info!(
        "Model: {} ({})",
        config.gemini.model,
        if config.gemini.api_key.is_some() {
            "configured"
        } else {
            "no API key"
        }
    );

    let generator = Arc::new(GeminiClient::new(config.gemini.clone())?);
    let result = web::run(&config, generator).await;
    if let Err(e) = &result {
        error!("{}", e.user_message());
    }

    telemetry.shutdown();
    result?;
    Ok(())
}
