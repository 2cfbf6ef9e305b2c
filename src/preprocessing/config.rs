//! Preprocessing configuration

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::schema;
use super::ImputeStrategy;

/// Which columns the scaler standardizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalingScope {
    /// Only columns that were numeric in the raw input
    NumericOnly,
    /// Every feature column, label-encoded categoricals included
    AllFeatures,
}

/// Where categorical vocabularies come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VocabularySource {
    /// Learned from the distinct values seen at fit time
    Learned,
    /// Seeded from fixed lists; columns without an entry are learned
    Fixed(BTreeMap<String, Vec<String>>),
}

/// Configuration for the feature preprocessor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    /// Identifier columns dropped before any processing
    pub id_columns: Vec<String>,

    /// Target column, kept out of the feature order
    pub target_column: String,

    /// Strategy for missing numeric values
    pub numeric_impute_strategy: ImputeStrategy,

    /// Strategy for missing categorical values
    pub categorical_impute_strategy: ImputeStrategy,

    pub scaling_scope: ScalingScope,

    pub vocabulary: VocabularySource,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            id_columns: vec![schema::ID_COLUMN.to_string()],
            target_column: schema::TARGET_COLUMN.to_string(),
            numeric_impute_strategy: ImputeStrategy::Median,
            categorical_impute_strategy: ImputeStrategy::MostFrequent,
            scaling_scope: ScalingScope::NumericOnly,
            vocabulary: VocabularySource::Learned,
        }
    }
}

impl PreprocessingConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration of the production reference preprocessor
    pub fn churn_reference() -> Self {
        Self::default()
            .with_fixed_vocabulary(schema::churn_vocabularies())
            .with_scaling_scope(ScalingScope::AllFeatures)
    }

    pub fn with_id_columns(mut self, columns: Vec<String>) -> Self {
        self.id_columns = columns;
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_column = target.into();
        self
    }

    /// Builder method to set numeric impute strategy
    pub fn with_numeric_impute(mut self, strategy: ImputeStrategy) -> Self {
        self.numeric_impute_strategy = strategy;
        self
    }

    /// Builder method to set categorical impute strategy
    pub fn with_categorical_impute(mut self, strategy: ImputeStrategy) -> Self {
        self.categorical_impute_strategy = strategy;
        self
    }

    pub fn with_scaling_scope(mut self, scope: ScalingScope) -> Self {
        self.scaling_scope = scope;
        self
    }

    pub fn with_fixed_vocabulary(mut self, vocabularies: BTreeMap<String, Vec<String>>) -> Self {
        self.vocabulary = VocabularySource::Fixed(vocabularies);
        self
    }

    /// Fixed vocabulary for a column, if one was configured
    pub fn fixed_vocabulary(&self, column: &str) -> Option<&[String]> {
        match &self.vocabulary {
            VocabularySource::Fixed(map) => map.get(column).map(|v| v.as_slice()),
            VocabularySource::Learned => None,
        }
    }
}
