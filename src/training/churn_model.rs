//! Persistable form of a trained classifier

use std::path::Path;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::gradient_boosting::GradientBoostingClassifier;
use super::linear_models::LogisticRegression;
use super::models::Classifier;
use super::random_forest::RandomForest;
use super::svm::SvmClassifier;
use crate::error::Result;
use crate::export::{load_artifact, save_artifact, ArtifactKind};

/// One of the roster's classifiers, tagged for serialization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "model_type", content = "model", rename_all = "snake_case")]
pub enum ChurnModel {
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForest),
    GradientBoosting(GradientBoostingClassifier),
    Svm(SvmClassifier),
}

impl ChurnModel {
    fn inner(&self) -> &dyn Classifier {
        match self {
            ChurnModel::LogisticRegression(m) => m,
            ChurnModel::RandomForest(m) => m,
            ChurnModel::GradientBoosting(m) => m,
            ChurnModel::Svm(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Classifier {
        match self {
            ChurnModel::LogisticRegression(m) => m,
            ChurnModel::RandomForest(m) => m,
            ChurnModel::GradientBoosting(m) => m,
            ChurnModel::Svm(m) => m,
        }
    }

    /// Write the model as a `model` artifact
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_artifact(path.as_ref(), ArtifactKind::Model, self)
    }

    /// Read a `model` artifact
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_artifact(path.as_ref(), ArtifactKind::Model)
    }
}

impl Classifier for ChurnModel {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.inner().predict_proba(x)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.inner().predict(x)
    }

    fn is_fitted(&self) -> bool {
        self.inner().is_fitted()
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.inner().feature_importances()
    }
}
