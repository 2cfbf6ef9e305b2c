//! Churn prediction HTTP service
//!
//! Serves the trained model over a small REST API. Startup tolerates missing
//! artifacts: the service runs degraded and answers prediction requests with
//! 503 until `/reload_model` succeeds.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::{ServerError, MODEL_UNAVAILABLE_MESSAGE};
pub use handlers::{BatchPredictionResponse, API_VERSION};
pub use state::AppState;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub preprocessor_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("CHURN_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("CHURN_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            model_path: std::env::var("CHURN_MODEL_PATH")
                .unwrap_or_else(|_| "models/best_model.json".to_string())
                .into(),
            preprocessor_path: std::env::var("CHURN_PREPROCESSOR_PATH")
                .unwrap_or_else(|_| "models/preprocessor.json".to_string())
                .into(),
        }
    }
}

impl ServerConfig {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }

    pub fn with_preprocessor_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.preprocessor_path = path.into();
        self
    }
}

/// Start the server with the given configuration
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();
    info!(
        model_path = %config.model_path.display(),
        preprocessor_path = %config.preprocessor_path.display(),
        "Loading model artifacts"
    );

    let load_config = config.clone();
    let state = Arc::new(tokio::task::spawn_blocking(move || AppState::load(load_config)).await?);
    if !state.is_loaded().await {
        warn!("API started but model loading failed - predictions will not work");
    }

    let app = create_router(Arc::clone(&state));
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening and ready to accept connections");

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
        let uptime = chrono::Utc::now().signed_duration_since(start_time);
        info!(uptime_secs = uptime.num_seconds(), "Shutdown signal received, stopping server gracefully");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}
