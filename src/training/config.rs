//! Training configuration and the candidate roster

use serde::{Deserialize, Serialize};

use super::churn_model::ChurnModel;
use super::gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
use super::linear_models::LogisticRegression;
use super::random_forest::RandomForest;
use super::svm::{SvmClassifier, SvmConfig};
use crate::error::{ChurnError, Result};

/// Candidate classifier families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    LogisticRegression,
    RandomForest,
    GradientBoosting,
    Svm,
}

impl ModelKind {
    /// Default roster, in evaluation order
    pub const ROSTER: [ModelKind; 4] = [
        ModelKind::LogisticRegression,
        ModelKind::RandomForest,
        ModelKind::GradientBoosting,
        ModelKind::Svm,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::LogisticRegression => "logistic_regression",
            ModelKind::RandomForest => "random_forest",
            ModelKind::GradientBoosting => "gradient_boosting",
            ModelKind::Svm => "svm",
        }
    }

    /// Build an untrained model of this kind
    pub fn build(&self, random_state: u64) -> ChurnModel {
        match self {
            ModelKind::LogisticRegression => {
                ChurnModel::LogisticRegression(LogisticRegression::new().with_max_iter(1000))
            }
            ModelKind::RandomForest => ChurnModel::RandomForest(
                RandomForest::new(100)
                    .with_max_depth(10)
                    .with_random_state(random_state),
            ),
            ModelKind::GradientBoosting => {
                ChurnModel::GradientBoosting(GradientBoostingClassifier::new(GradientBoostingConfig {
                    random_state: Some(random_state),
                    ..Default::default()
                }))
            }
            ModelKind::Svm => ChurnModel::Svm(SvmClassifier::new(SvmConfig {
                random_state: Some(random_state),
                ..Default::default()
            })),
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ModelKind {
    type Err = ChurnError;

    fn from_str(s: &str) -> Result<Self> {
        ModelKind::ROSTER
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ChurnError::InvalidParameter {
                name: "model".to_string(),
                value: s.to_string(),
                reason: "unknown model kind".to_string(),
            })
    }
}

/// Training configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Fraction of rows held out for evaluation
    pub test_size: f64,
    /// Seed for the split and for every seeded model
    pub random_state: u64,
    /// Candidates, trained and compared in this order
    pub models: Vec<ModelKind>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            random_state: 42,
            models: ModelKind::ROSTER.to_vec(),
        }
    }
}

impl TrainingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_models(mut self, models: Vec<ModelKind>) -> Self {
        self.models = models;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(ChurnError::InvalidParameter {
                name: "test_size".to_string(),
                value: self.test_size.to_string(),
                reason: "must lie strictly between 0 and 1".to_string(),
            });
        }
        if self.models.is_empty() {
            return Err(ChurnError::InvalidParameter {
                name: "models".to_string(),
                value: "[]".to_string(),
                reason: "at least one candidate is required".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::Classifier;

    #[test]
    fn test_roster_order_and_names() {
        let names: Vec<&str> = ModelKind::ROSTER.iter().map(|k| k.name()).collect();
        assert_eq!(names, vec!["logistic_regression", "random_forest", "gradient_boosting", "svm"]);

        for kind in ModelKind::ROSTER {
            let model = kind.build(42);
            assert_eq!(model.name(), kind.name());
            assert!(!model.is_fitted());
        }
    }

    #[test]
    fn test_parse_model_kind() {
        assert_eq!("svm".parse::<ModelKind>().unwrap(), ModelKind::Svm);
        assert!("knn".parse::<ModelKind>().is_err());
    }

    #[test]
    fn test_validate() {
        assert!(TrainingConfig::default().validate().is_ok());
        assert!(TrainingConfig::default().with_test_size(1.0).validate().is_err());
        assert!(TrainingConfig::default().with_models(vec![]).validate().is_err());
    }
}
