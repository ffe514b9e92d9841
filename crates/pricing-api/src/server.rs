use std::sync::Arc;

use anyhow::{Context, Result};
use pricing_core::Settings;
use pricing_model::TrainedModel;
use pricing_storage::StorageGateway;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use crate::{create_router, ApiKeySet, AppState};

/// Download the configured model blob and deserialize it.
pub async fn load_model(settings: &Settings) -> Result<TrainedModel> {
    let gateway = StorageGateway::from_settings(settings).context("configuring model storage")?;
    let key = settings.bucket_model_path.as_str();
    info!(key, location = %gateway.location(), "Loading model");

    let path = gateway
        .download(key)
        .await
        .with_context(|| format!("downloading model '{}' from {}", key, gateway.location()))?;
    TrainedModel::load(&path).with_context(|| format!("loading model from {}", path.display()))
}

/// An API server whose model is already loaded. Construction fails without a
/// usable model, so a `Server` never accepts requests it cannot answer.
pub struct Server {
    state: AppState,
    host: String,
    port: u16,
}

impl Server {
    pub fn new(state: AppState, host: impl Into<String>, port: u16) -> Self {
        Self {
            state,
            host: host.into(),
            port,
        }
    }

    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let keys = ApiKeySet::from_settings(settings).context("reading API keys")?;
        let model = load_model(settings).await?;
        info!(
            features = model.feature_columns().len(),
            accepted_keys = keys.len(),
            "Model loaded"
        );
        let state = AppState::new(Arc::new(model), keys);
        Ok(Self::new(state, settings.api_host.clone(), settings.api_port))
    }

    pub async fn run(self) -> Result<()> {
        let router = create_router(self.state);
        let listener = TcpListener::bind((self.host.as_str(), self.port))
            .await
            .with_context(|| format!("binding {}:{}", self.host, self.port))?;

        info!("Server listening on http://{}", listener.local_addr()?);
        info!("  GET  /        - API information");
        info!("  GET  /health  - Liveness probe");
        info!("  POST /predict - Price prediction");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("serving HTTP")?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}
