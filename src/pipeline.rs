//! End-to-end training and batch scoring
//!
//! Ties ingestion, preprocessing, model selection and persistence together
//! the way the `churn train` and `churn predict` commands run them.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;

use polars::prelude::*;
use tracing::{info, warn};

use crate::data::{self, GeneratorConfig};
use crate::error::Result;
use crate::inference::{churn_label, ChurnPredictor, Confidence};
use crate::preprocessing::schema::{ID_COLUMN, TARGET_COLUMN};
use crate::preprocessing::{target_to_vector, FeaturePreprocessor, PreprocessingConfig};
use crate::training::{ModelTrainer, RunReport, TrainingConfig, TrainingReport};

pub const BEST_MODEL_FILE: &str = "best_model.json";
pub const PREPROCESSOR_FILE: &str = "preprocessor.json";
pub const RUN_REPORT_FILE: &str = "run_report.json";
pub const FEATURE_IMPORTANCE_FILE: &str = "feature_importance.csv";

/// Everything one training run needs
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub data_path: PathBuf,
    pub output_dir: PathBuf,
    /// Used only when `data_path` does not exist yet
    pub generator: GeneratorConfig,
    pub preprocessing: PreprocessingConfig,
    pub training: TrainingConfig,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/customer_data.csv"),
            output_dir: PathBuf::from("models"),
            generator: GeneratorConfig::default(),
            preprocessing: PreprocessingConfig::default(),
            training: TrainingConfig::default(),
        }
    }
}

impl PipelineOptions {
    pub fn new(data_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_generator(mut self, generator: GeneratorConfig) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_preprocessing(mut self, preprocessing: PreprocessingConfig) -> Self {
        self.preprocessing = preprocessing;
        self
    }

    pub fn with_training(mut self, training: TrainingConfig) -> Self {
        self.training = training;
        self
    }

    pub fn model_path(&self) -> PathBuf {
        self.output_dir.join(BEST_MODEL_FILE)
    }

    pub fn preprocessor_path(&self) -> PathBuf {
        self.output_dir.join(PREPROCESSOR_FILE)
    }
}

/// What a finished training run produced
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub report: TrainingReport,
    pub best_f1_score: f64,
    pub feature_columns: Vec<String>,
    /// Highest first; empty when the best model has no importances
    pub feature_importances: Vec<(String, f64)>,
    pub generated_data: bool,
    pub model_path: PathBuf,
    pub preprocessor_path: PathBuf,
    pub report_path: PathBuf,
}

/// Ingest, preprocess, train every candidate and persist the winner.
///
/// Generates a synthetic dataset at `data_path` first when the file is
/// absent.
pub fn run_training(options: &PipelineOptions) -> Result<PipelineOutcome> {
    let start = Instant::now();

    let generated_data = !options.data_path.exists();
    if generated_data {
        info!(path = %options.data_path.display(), "Data file not found, generating synthetic data");
        let mut frame = data::generate_customer_data(&options.generator)?;
        data::write_csv(&mut frame, &options.data_path)?;
    }

    let raw = data::load_path(&options.data_path)?;
    data::validate(&raw, &[TARGET_COLUMN])?;

    let mut preprocessor = FeaturePreprocessor::with_config(options.preprocessing.clone());
    let processed = preprocessor.fit_transform(&raw)?;
    let target = &options.preprocessing.target_column;
    let (features, labels) = FeaturePreprocessor::split_features_target(&processed, target)?;
    let x = preprocessor.to_matrix(&features)?;
    let y = target_to_vector(&labels)?;

    let mut trainer = ModelTrainer::new(options.training.clone());
    let report = trainer.train_and_evaluate(&x, &y)?;
    let best_f1_score = trainer.best_model().map(|(_, f1)| f1).unwrap_or(0.0);

    let model_path = options.model_path();
    let preprocessor_path = options.preprocessor_path();
    let report_path = options.output_dir.join(RUN_REPORT_FILE);

    trainer.save_best_model(&model_path)?;
    preprocessor.save(&preprocessor_path)?;

    let feature_columns = preprocessor.feature_columns().to_vec();
    RunReport::new(&report, &feature_columns).save(&report_path)?;

    let feature_importances = trainer.feature_importances(&feature_columns).unwrap_or_default();
    if feature_importances.is_empty() {
        warn!(
            model = report.best_model.as_deref().unwrap_or("none"),
            "Best model exposes no feature importances"
        );
    } else {
        write_feature_importance(
            &feature_importances,
            options.output_dir.join(FEATURE_IMPORTANCE_FILE),
        )?;
    }

    info!(
        best_model = report.best_model.as_deref().unwrap_or("none"),
        f1 = best_f1_score,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Training pipeline finished"
    );

    Ok(PipelineOutcome {
        report,
        best_f1_score,
        feature_columns,
        feature_importances,
        generated_data,
        model_path,
        preprocessor_path,
        report_path,
    })
}

/// Write `(feature, importance)` pairs as a two-column CSV, in the order given
pub fn write_feature_importance(pairs: &[(String, f64)], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut frame = DataFrame::new(vec![
        Column::new(
            "feature".into(),
            pairs.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            "importance".into(),
            pairs.iter().map(|(_, value)| *value).collect::<Vec<f64>>(),
        ),
    ])?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(&mut frame)?;
    Ok(())
}

/// Score every row of a customer CSV.
///
/// The result carries `customer_id` when the input has one, followed by
/// `churn_probability`, `churn_prediction` and `confidence`. When `output`
/// is given the frame is also written there as CSV.
pub fn predict_file(
    predictor: &ChurnPredictor,
    data_path: impl AsRef<Path>,
    output: Option<&Path>,
) -> Result<DataFrame> {
    let raw = data::load_path(data_path.as_ref())?;
    data::validate(&raw, &[])?;

    let probabilities = predictor.predict_frame(&raw)?;
    let labels: Vec<&str> = probabilities.iter().map(|&p| churn_label(p)).collect();
    let confidence: Vec<&str> = probabilities
        .iter()
        .map(|&p| Confidence::from_probability(p).as_str())
        .collect();

    let mut columns = Vec::with_capacity(4);
    if let Ok(ids) = raw.column(ID_COLUMN) {
        columns.push(ids.clone());
    }
    columns.push(Column::new("churn_probability".into(), probabilities));
    columns.push(Column::new("churn_prediction".into(), labels));
    columns.push(Column::new("confidence".into(), confidence));
    let mut frame = DataFrame::new(columns)?;

    if let Some(path) = output {
        data::write_csv(&mut frame, path)?;
        info!(rows = frame.height(), path = %path.display(), "Predictions written");
    }
    Ok(frame)
}
