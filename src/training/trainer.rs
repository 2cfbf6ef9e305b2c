//! Model selection: split, train every candidate, keep the best by F1

use std::path::Path;
use std::time::Instant;

use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::churn_model::ChurnModel;
use super::config::TrainingConfig;
use super::models::{Classifier, ModelMetrics};
use crate::error::{ChurnError, Result};

/// Metrics for one candidate, in roster order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEvaluation {
    pub model_name: String,
    pub metrics: ModelMetrics,
}

/// Outcome of [`ModelTrainer::train_and_evaluate`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Evaluated candidates, in the order they were trained
    pub results: Vec<ModelEvaluation>,
    pub best_model: Option<String>,
    pub n_train: usize,
    pub n_test: usize,
}

impl TrainingReport {
    pub fn get(&self, model_name: &str) -> Option<&ModelMetrics> {
        self.results
            .iter()
            .find(|r| r.model_name == model_name)
            .map(|r| &r.metrics)
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.model_name.as_str()).collect()
    }
}

/// Shuffled train/test partition
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<f64>,
    pub y_test: Array1<f64>,
}

/// Shuffle rows with a seeded ChaCha8 generator and hold out
/// `ceil(n * test_size)` of them for evaluation
pub fn train_test_split(
    x: &Array2<f64>,
    y: &Array1<f64>,
    test_size: f64,
    random_state: u64,
) -> Result<TrainTestSplit> {
    let n = x.nrows();
    if n != y.len() {
        return Err(ChurnError::ShapeMismatch {
            expected: format!("{} labels", n),
            actual: format!("{} labels", y.len()),
        });
    }
    if n < 2 {
        return Err(ChurnError::ValidationFailure(format!(
            "need at least 2 rows to split, got {}",
            n
        )));
    }

    let n_test = (n as f64 * test_size).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(ChurnError::ValidationFailure(format!(
            "test_size {} leaves an empty partition for {} rows",
            test_size, n
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(random_state);
    indices.shuffle(&mut rng);
    let (test_idx, train_idx) = indices.split_at(n_test);

    Ok(TrainTestSplit {
        x_train: x.select(Axis(0), train_idx),
        x_test: x.select(Axis(0), test_idx),
        y_train: train_idx.iter().map(|&i| y[i]).collect(),
        y_test: test_idx.iter().map(|&i| y[i]).collect(),
    })
}

#[derive(Debug, Clone)]
struct BestModel {
    name: String,
    f1_score: f64,
    model: ChurnModel,
}

/// Trains the configured roster and keeps the best model
#[derive(Debug, Clone, Default)]
pub struct ModelTrainer {
    config: TrainingConfig,
    results: Vec<ModelEvaluation>,
    best: Option<BestModel>,
}

impl ModelTrainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            results: Vec::new(),
            best: None,
        }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Split, fit each candidate on the training rows and score it on the
    /// held-out rows. A candidate that fails to fit is skipped.
    pub fn train_and_evaluate(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<TrainingReport> {
        self.config.validate()?;
        let split = train_test_split(x, y, self.config.test_size, self.config.random_state)?;

        info!(
            n_train = split.x_train.nrows(),
            n_test = split.x_test.nrows(),
            n_features = x.ncols(),
            "Training candidate models"
        );

        self.results.clear();
        self.best = None;

        for kind in &self.config.models {
            let start = Instant::now();
            let mut model = kind.build(self.config.random_state);

            if let Err(e) = model.fit(&split.x_train, &split.y_train) {
                warn!(model = kind.name(), error = %e, "Model training failed, skipping");
                continue;
            }
            let training_time = start.elapsed().as_secs_f64();

            let (y_pred, y_prob) = match model
                .predict(&split.x_test)
                .and_then(|pred| model.predict_proba(&split.x_test).map(|prob| (pred, prob)))
            {
                Ok(out) => out,
                Err(e) => {
                    warn!(model = kind.name(), error = %e, "Model evaluation failed, skipping");
                    continue;
                }
            };

            let mut metrics = ModelMetrics::compute_classification(&split.y_test, &y_pred, Some(&y_prob));
            metrics.training_time_secs = training_time;

            info!(
                model = kind.name(),
                accuracy = metrics.accuracy,
                f1 = metrics.f1_score,
                secs = training_time,
                "Model evaluated"
            );

            let improves = self
                .best
                .as_ref()
                .map_or(true, |best| metrics.f1_score > best.f1_score);
            if improves {
                self.best = Some(BestModel {
                    name: kind.name().to_string(),
                    f1_score: metrics.f1_score,
                    model,
                });
            }

            self.results.push(ModelEvaluation {
                model_name: kind.name().to_string(),
                metrics,
            });
        }

        let best = self.best.as_ref().ok_or_else(|| {
            ChurnError::TrainingError("every candidate model failed to train".to_string())
        })?;
        info!(model = %best.name, f1 = best.f1_score, "Best model selected");

        Ok(TrainingReport {
            results: self.results.clone(),
            best_model: Some(best.name.clone()),
            n_train: split.x_train.nrows(),
            n_test: split.x_test.nrows(),
        })
    }

    /// The best fitted model and its F1 score
    pub fn best_model(&self) -> Option<(&ChurnModel, f64)> {
        self.best.as_ref().map(|b| (&b.model, b.f1_score))
    }

    pub fn best_model_name(&self) -> Option<&str> {
        self.best.as_ref().map(|b| b.name.as_str())
    }

    pub fn results(&self) -> &[ModelEvaluation] {
        &self.results
    }

    pub fn save_best_model(&self, path: impl AsRef<Path>) -> Result<()> {
        let best = self.best.as_ref().ok_or(ChurnError::NoTrainedModel)?;
        best.model.save(path)?;
        info!(model = %best.name, "Best model saved");
        Ok(())
    }

    /// Best model's feature importances paired with names, highest first
    pub fn feature_importances(&self, feature_names: &[String]) -> Option<Vec<(String, f64)>> {
        let importances = self.best.as_ref()?.model.feature_importances()?;
        let mut pairs: Vec<(String, f64)> = feature_names
            .iter()
            .cloned()
            .zip(importances.iter().copied())
            .collect();
        pairs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Some(pairs)
    }
}
