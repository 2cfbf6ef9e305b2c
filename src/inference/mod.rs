//! Inference: scoring raw customer records with a trained model
//!
//! [`ChurnPredictor`] owns a fitted preprocessor and a fitted model. It is
//! immutable once built, so the server shares it behind an `Arc`.

mod predictor;
mod records;

pub use predictor::ChurnPredictor;
pub use records::{churn_label, BatchPrediction, Confidence, CustomerRecord, PredictionResponse, CHURN_THRESHOLD};
