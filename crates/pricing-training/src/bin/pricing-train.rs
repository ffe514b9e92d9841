use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use pricing_core::{telemetry, Settings};
use pricing_model::{GradientBoostingModel, GradientBoostingParams};
use pricing_storage::StorageGateway;
use pricing_training::{CsvDataloader, Trainer};
use serde_json::json;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "pricing-train")]
#[command(about = "Train the property price model, save it and optionally upload it", long_about = None)]
#[command(version)]
struct Cli {
    /// Training CSV
    #[arg(long, default_value = "data/train.csv")]
    train_path: PathBuf,

    /// Held-out CSV used for evaluation
    #[arg(long, default_value = "data/test.csv")]
    test_path: PathBuf,

    /// Where the model artifact is written
    #[arg(short, long, default_value = "models/model.bin")]
    output: PathBuf,

    /// Upload the artifact to the configured bucket after saving
    #[arg(long)]
    upload: bool,

    /// Blob key for the upload (defaults to the output path)
    #[arg(long)]
    upload_key: Option<String>,

    /// Random seed for the estimator
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Env file loaded before reading configuration
    #[arg(long, env = "PRICING_ENV_FILE")]
    env_file: Option<PathBuf>,

    /// Directory holding pricing.toml / local.toml
    #[arg(long, env = "PRICING_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    #[arg(long)]
    learning_rate: Option<f64>,

    #[arg(long)]
    n_estimators: Option<usize>,

    #[arg(long)]
    max_depth: Option<usize>,
}

impl Cli {
    fn params(&self) -> GradientBoostingParams {
        let mut params = GradientBoostingParams::default().with_seed(self.seed);
        if let Some(rate) = self.learning_rate {
            params.learning_rate = rate;
        }
        if let Some(n) = self.n_estimators {
            params.n_estimators = n;
        }
        if let Some(depth) = self.max_depth {
            params.max_depth = depth;
        }
        params
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config_dir.as_deref(), cli.env_file.as_deref())
        .context("loading configuration")?;
    let _log_guard = telemetry::init_tracing(
        &settings,
        &["pricing_train", "pricing_training", "pricing_model", "pricing_storage", "pricing_core"],
    )
    .context("initialising logging")?;

    let params = cli.params();
    params.validate().context("invalid hyper-parameters")?;
    info!(?params, "Starting training run");

    let dataloader = CsvDataloader::new(&cli.train_path, &cli.test_path);
    let mut trainer = Trainer::with_model(&dataloader, |preprocessor| {
        GradientBoostingModel::with_params(preprocessor, params)
    })
    .context("preparing training data")?;

    if cli.upload {
        match StorageGateway::from_settings(&settings) {
            Ok(gateway) => trainer = trainer.with_storage(gateway),
            Err(e) => warn!(error = %e, "Storage is not available; the model will only be saved locally"),
        }
    }
    if let Some(key) = cli.upload_key.as_deref() {
        trainer = trainer.with_upload_key(key);
    }

    let report = trainer
        .train(&cli.output, cli.upload)
        .await
        .context("training the model")?;
    let metrics = trainer.evaluate(None).context("evaluating the model")?;

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "artifact_path": report.artifact_path,
            "uploaded": report.uploaded,
            "rows": report.rows,
            "metrics": metrics,
        }))?
    );
    Ok(())
}
