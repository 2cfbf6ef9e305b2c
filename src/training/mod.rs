//! Model training module
//!
//! Candidate binary classifiers for churn and the selection loop over them:
//! - Logistic regression
//! - Random forest over CART trees
//! - Gradient boosted trees
//! - RBF support vector classifier with Platt-scaled probabilities

mod churn_model;
mod config;
mod models;
mod report;
mod trainer;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod linear_models;
pub mod platt;
pub mod random_forest;
pub mod svm;

pub use churn_model::ChurnModel;
pub use config::{ModelKind, TrainingConfig};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
pub use linear_models::LogisticRegression;
pub use models::{roc_auc, Classifier, ModelMetrics};
pub use platt::PlattScaling;
pub use random_forest::{MaxFeatures, RandomForest};
pub use report::RunReport;
pub use svm::{KernelType, SvmClassifier, SvmConfig};
pub use trainer::{train_test_split, ModelEvaluation, ModelTrainer, TrainTestSplit, TrainingReport};
