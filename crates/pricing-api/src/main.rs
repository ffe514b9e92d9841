use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use pricing_api::Server;
use pricing_core::{telemetry, Settings};

#[derive(Parser, Debug)]
#[command(name = "pricing-api")]
#[command(about = "Serve property price predictions over HTTP", long_about = None)]
#[command(version)]
struct Cli {
    /// Env file loaded before reading configuration (defaults to api.env or .env)
    #[arg(long, env = "PRICING_ENV_FILE")]
    env_file: Option<PathBuf>,

    /// Directory holding pricing.toml / local.toml
    #[arg(long, env = "PRICING_CONFIG_DIR")]
    config_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config_dir.as_deref(), cli.env_file.as_deref())
        .context("loading configuration")?;
    let _log_guard = telemetry::init_tracing(
        &settings,
        &["pricing_api", "pricing_model", "pricing_storage", "pricing_core", "tower_http"],
    )
    .context("initialising logging")?;

    let server = Server::from_settings(&settings).await?;
    server.run().await
}
