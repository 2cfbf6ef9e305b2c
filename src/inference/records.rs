//! Request and response records for single and batch prediction

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Threshold above which a customer is predicted to churn
pub const CHURN_THRESHOLD: f64 = 0.5;

/// One customer's raw features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub tenure: f64,
    pub monthly_charges: f64,
    pub total_charges: f64,
    pub contract_type: String,
    pub payment_method: String,
    pub paperless_billing: String,
    pub internet_service: String,
    pub online_security: String,
    pub online_backup: String,
    pub device_protection: String,
    pub tech_support: String,
    pub streaming_tv: String,
    pub streaming_movies: String,
}

impl CustomerRecord {
    /// Records as a frame in the raw ingestion schema
    pub fn to_frame(records: &[CustomerRecord]) -> Result<DataFrame> {
        let numeric = |f: fn(&CustomerRecord) -> f64| records.iter().map(f).collect::<Vec<f64>>();
        let text = |f: fn(&CustomerRecord) -> &str| records.iter().map(f).collect::<Vec<&str>>();

        let frame = DataFrame::new(vec![
            Column::new("tenure".into(), numeric(|r| r.tenure)),
            Column::new("monthly_charges".into(), numeric(|r| r.monthly_charges)),
            Column::new("total_charges".into(), numeric(|r| r.total_charges)),
            Column::new("contract_type".into(), text(|r| &r.contract_type)),
            Column::new("payment_method".into(), text(|r| &r.payment_method)),
            Column::new("paperless_billing".into(), text(|r| &r.paperless_billing)),
            Column::new("internet_service".into(), text(|r| &r.internet_service)),
            Column::new("online_security".into(), text(|r| &r.online_security)),
            Column::new("online_backup".into(), text(|r| &r.online_backup)),
            Column::new("device_protection".into(), text(|r| &r.device_protection)),
            Column::new("tech_support".into(), text(|r| &r.tech_support)),
            Column::new("streaming_tv".into(), text(|r| &r.streaming_tv)),
            Column::new("streaming_movies".into(), text(|r| &r.streaming_movies)),
        ])?;
        Ok(frame)
    }
}

/// How far a probability sits from the decision threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// High outside (0.3, 0.7), Medium outside (0.4, 0.6), Low otherwise
    pub fn from_probability(p: f64) -> Self {
        if p > 0.7 || p < 0.3 {
            Confidence::High
        } else if p > 0.6 || p < 0.4 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "High",
            Confidence::Medium => "Medium",
            Confidence::Low => "Low",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// "Yes" above the churn threshold, else "No"
pub fn churn_label(probability: f64) -> &'static str {
    if probability > CHURN_THRESHOLD {
        "Yes"
    } else {
        "No"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub churn_probability: f64,
    pub churn_prediction: String,
    pub confidence: Confidence,
}

impl PredictionResponse {
    pub fn from_probability(probability: f64) -> Self {
        Self {
            churn_probability: probability,
            churn_prediction: churn_label(probability).to_string(),
            confidence: Confidence::from_probability(probability),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPrediction {
    /// Position of the record in the request
    pub customer_index: usize,
    pub churn_probability: f64,
    pub churn_prediction: String,
    pub confidence: Confidence,
}

impl BatchPrediction {
    pub fn new(customer_index: usize, probability: f64) -> Self {
        let response = PredictionResponse::from_probability(probability);
        Self {
            customer_index,
            churn_probability: response.churn_probability,
            churn_prediction: response.churn_prediction,
            confidence: response.confidence,
        }
    }
}
