//! Run report written next to the trained artifacts

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::trainer::{ModelEvaluation, TrainingReport};
use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub n_train: usize,
    pub n_test: usize,
    pub results: Vec<ModelEvaluation>,
    pub best_model: Option<String>,
    pub best_f1_score: Option<f64>,
    /// Feature order the model was trained on
    pub feature_columns: Vec<String>,
}

impl RunReport {
    pub fn new(report: &TrainingReport, feature_columns: &[String]) -> Self {
        let best_f1_score = report
            .best_model
            .as_deref()
            .and_then(|name| report.get(name))
            .map(|m| m.f1_score);

        Self {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            n_train: report.n_train,
            n_test: report.n_test,
            results: report.results.clone(),
            best_model: report.best_model.clone(),
            best_f1_score,
            feature_columns: feature_columns.to_vec(),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}
