//! Data preprocessing module
//!
//! Turns raw customer records into model-ready features:
//! - Missing value imputation with fit-time statistics
//! - Categorical label encoding (learned or fixed vocabularies)
//! - Standard scaling
//! - A frozen canonical feature order shared by training and serving

mod config;
mod encoder;
mod imputer;
mod pipeline;
mod scaler;
pub mod schema;

pub use config::{PreprocessingConfig, ScalingScope, VocabularySource};
pub use encoder::{EncoderRegistry, LabelEncoder};
pub use imputer::{FillValue, ImputeStrategy, Imputer, UNKNOWN_CATEGORY};
pub use pipeline::{frame_to_matrix, target_to_vector, FeaturePreprocessor, TransformOutput};
pub use scaler::{Scaler, ScalerParams};

use serde::{Deserialize, Serialize};

/// Column role decided once on the first fit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Categorical,
}
