//! Application state management

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use super::ServerConfig;
use crate::error::{ChurnError, Result};
use crate::inference::ChurnPredictor;

/// Application state shared across handlers
pub struct AppState {
    pub config: ServerConfig,
    pub started_at: chrono::DateTime<chrono::Utc>,
    predictor: RwLock<Option<Arc<ChurnPredictor>>>,
}

impl AppState {
    /// State with nothing loaded
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            started_at: chrono::Utc::now(),
            predictor: RwLock::new(None),
        }
    }

    /// State serving an already-built predictor
    pub fn with_predictor(config: ServerConfig, predictor: ChurnPredictor) -> Self {
        Self {
            config,
            started_at: chrono::Utc::now(),
            predictor: RwLock::new(Some(Arc::new(predictor))),
        }
    }

    /// Load the configured artifacts; on failure the state starts degraded
    pub fn load(config: ServerConfig) -> Self {
        let mut state = Self::new(config);
        match ChurnPredictor::load(&state.config.model_path, &state.config.preprocessor_path) {
            Ok(predictor) => {
                info!(model = predictor.model_name(), "Model and preprocessor loaded");
                state.predictor = RwLock::new(Some(Arc::new(predictor)));
            }
            Err(e) => {
                warn!(error = %e, "Model loading failed, predictions will not work until reload");
            }
        }
        state
    }

    /// Snapshot of the current predictor
    pub async fn predictor(&self) -> Option<Arc<ChurnPredictor>> {
        self.predictor.read().await.clone()
    }

    pub async fn is_loaded(&self) -> bool {
        self.predictor.read().await.is_some()
    }

    /// Build a new predictor from disk and swap it in. On error the previous
    /// predictor stays in place.
    pub async fn reload(&self) -> Result<Arc<ChurnPredictor>> {
        let model_path = self.config.model_path.clone();
        let preprocessor_path = self.config.preprocessor_path.clone();
        let predictor = tokio::task::spawn_blocking(move || ChurnPredictor::load(model_path, preprocessor_path))
            .await
            .map_err(|e| ChurnError::InferenceError(format!("reload task failed: {}", e)))??;

        let predictor = Arc::new(predictor);
        *self.predictor.write().await = Some(Arc::clone(&predictor));
        info!(model = predictor.model_name(), "Predictor reloaded");
        Ok(predictor)
    }
}
