//! Churn Pipeline - customer churn prediction
//!
//! This crate provides:
//! - Synthetic customer data and CSV ingestion
//! - A feature preprocessor with one fit-time contract shared by training and serving
//! - Multi-model training with best-model selection by F1
//! - A predictor and HTTP service over the persisted artifacts
//!
//! # Modules
//!
//! - [`data`] - Ingestion and synthetic data generation
//! - [`preprocessing`] - Imputation, encoding, scaling, feature order
//! - [`training`] - Candidate classifiers and model selection
//! - [`inference`] - Scoring raw customer records
//! - [`export`] - Versioned artifact persistence
//! - [`pipeline`] - End-to-end training and batch scoring
//! - [`server`] - HTTP server with REST API
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Core ML modules
pub mod preprocessing;
pub mod training;
pub mod inference;

// Data and persistence
pub mod data;
pub mod export;
pub mod pipeline;

// Services
pub mod server;
pub mod cli;

pub use error::{ChurnError, Degradation, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{ChurnError, Degradation, Result};

    // Data
    pub use crate::data::{generate_customer_data, load_path, GeneratorConfig};

    // Preprocessing
    pub use crate::preprocessing::{FeaturePreprocessor, PreprocessingConfig};

    // Training
    pub use crate::training::{ChurnModel, Classifier, ModelKind, ModelTrainer, TrainingConfig};

    // Inference
    pub use crate::inference::{ChurnPredictor, CustomerRecord, PredictionResponse};

    // Pipeline
    pub use crate::pipeline::{run_training, PipelineOptions};
}
