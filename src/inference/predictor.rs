//! Fitted preprocessor plus fitted model, ready to score raw customers

use std::path::Path;
use std::time::Instant;

use polars::prelude::*;
use tracing::{debug, info};

use super::records::{BatchPrediction, CustomerRecord, PredictionResponse};
use crate::error::{ChurnError, Degradation, Result};
use crate::preprocessing::FeaturePreprocessor;
use crate::training::{ChurnModel, Classifier};

#[derive(Debug, Clone)]
pub struct ChurnPredictor {
    preprocessor: FeaturePreprocessor,
    model: ChurnModel,
}

impl ChurnPredictor {
    /// Pair a fitted preprocessor with a fitted model
    pub fn new(preprocessor: FeaturePreprocessor, model: ChurnModel) -> Result<Self> {
        if !preprocessor.is_fitted() {
            return Err(ChurnError::not_fitted("ChurnPredictor::new (preprocessor)"));
        }
        if !model.is_fitted() {
            return Err(ChurnError::not_fitted("ChurnPredictor::new (model)"));
        }
        Ok(Self { preprocessor, model })
    }

    /// Load both artifacts; either failing is `ArtifactUnavailable`
    pub fn load(model_path: impl AsRef<Path>, preprocessor_path: impl AsRef<Path>) -> Result<Self> {
        let model = ChurnModel::load(model_path.as_ref())?;
        let preprocessor = FeaturePreprocessor::load(preprocessor_path.as_ref())?;
        info!(
            model = model.name(),
            features = preprocessor.feature_columns().len(),
            "Predictor loaded"
        );
        Self::new(preprocessor, model)
    }

    pub fn model(&self) -> &ChurnModel {
        &self.model
    }

    pub fn model_name(&self) -> &'static str {
        self.model.name()
    }

    pub fn preprocessor(&self) -> &FeaturePreprocessor {
        &self.preprocessor
    }

    pub fn feature_columns(&self) -> &[String] {
        self.preprocessor.feature_columns()
    }

    /// Churn probabilities for every row of a raw frame, plus what degraded
    pub fn predict_frame_with_diagnostics(&self, frame: &DataFrame) -> Result<(Vec<f64>, Vec<Degradation>)> {
        if frame.height() == 0 {
            return Ok((Vec::new(), Vec::new()));
        }
        let start = Instant::now();
        let output = self.preprocessor.transform_with_diagnostics(frame)?;
        let x = self.preprocessor.to_matrix(&output.frame)?;
        let proba = self
            .model
            .predict_proba(&x)
            .map_err(|e| ChurnError::InferenceError(e.to_string()))?;

        debug!(
            rows = frame.height(),
            degradations = output.degradations.len(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Scored frame"
        );
        Ok((proba.to_vec(), output.degradations))
    }

    /// Churn probabilities for every row of a raw frame
    pub fn predict_frame(&self, frame: &DataFrame) -> Result<Vec<f64>> {
        self.predict_frame_with_diagnostics(frame).map(|(p, _)| p)
    }

    pub fn predict(&self, record: &CustomerRecord) -> Result<PredictionResponse> {
        let frame = CustomerRecord::to_frame(std::slice::from_ref(record))?;
        let proba = self.predict_frame(&frame)?;
        let p = proba
            .first()
            .copied()
            .ok_or_else(|| ChurnError::InferenceError("model returned no prediction".to_string()))?;
        Ok(PredictionResponse::from_probability(p))
    }

    /// One prediction per record, indexed by input position
    pub fn predict_batch(&self, records: &[CustomerRecord]) -> Result<Vec<BatchPrediction>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let frame = CustomerRecord::to_frame(records)?;
        let proba = self.predict_frame(&frame)?;
        Ok(proba
            .into_iter()
            .enumerate()
            .map(|(i, p)| BatchPrediction::new(i, p))
            .collect())
    }
}
