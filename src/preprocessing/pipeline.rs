//! Feature preprocessing pipeline
//!
//! [`FeaturePreprocessor`] turns raw customer records into a numeric feature
//! frame. The first fit freezes the column partition, the fitted components
//! and the feature column order; every later call reuses them, so training
//! and serving produce the same columns in the same order.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::config::{PreprocessingConfig, ScalingScope, VocabularySource};
use super::encoder::{EncoderRegistry, LabelEncoder};
use super::imputer::Imputer;
use super::scaler::Scaler;
use super::{schema, ColumnType};
use crate::error::{ChurnError, Degradation, Result};
use crate::export::{load_artifact, save_artifact, ArtifactKind};

/// Everything learned by the first fit. Replaced as a whole, never patched.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FittedState {
    numeric_columns: Vec<String>,
    categorical_columns: Vec<String>,
    imputer: Imputer,
    encoders: EncoderRegistry,
    target_encoder: Option<LabelEncoder>,
    scaler: Scaler,
    feature_columns: Vec<String>,
}

/// A transformed frame plus the recoverable problems met on the way
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub frame: DataFrame,
    pub degradations: Vec<Degradation>,
}

/// Main feature preprocessing pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturePreprocessor {
    config: PreprocessingConfig,
    state: Option<FittedState>,
}

impl FeaturePreprocessor {
    /// Create a new preprocessor with default configuration
    pub fn new() -> Self {
        Self::with_config(PreprocessingConfig::default())
    }

    /// Create a new preprocessor with custom configuration
    pub fn with_config(config: PreprocessingConfig) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// The production reference preprocessor: fixed vocabularies, every
    /// feature scaled, fit on a small spread of representative customers.
    pub fn churn_reference() -> Result<Self> {
        let mut preprocessor = Self::with_config(PreprocessingConfig::churn_reference());
        preprocessor.fit_transform(&reference_sample()?)?;
        Ok(preprocessor)
    }

    pub fn config(&self) -> &PreprocessingConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    /// Canonical feature order, empty before the first fit
    pub fn feature_columns(&self) -> &[String] {
        self.state
            .as_ref()
            .map(|s| s.feature_columns.as_slice())
            .unwrap_or(&[])
    }

    pub fn numeric_columns(&self) -> &[String] {
        self.state
            .as_ref()
            .map(|s| s.numeric_columns.as_slice())
            .unwrap_or(&[])
    }

    pub fn categorical_columns(&self) -> &[String] {
        self.state
            .as_ref()
            .map(|s| s.categorical_columns.as_slice())
            .unwrap_or(&[])
    }

    pub fn encoder(&self, column: &str) -> Option<&LabelEncoder> {
        self.state.as_ref().and_then(|s| s.encoders.get(column))
    }

    pub fn target_encoder(&self) -> Option<&LabelEncoder> {
        self.state.as_ref().and_then(|s| s.target_encoder.as_ref())
    }

    pub fn scaler(&self) -> Option<&Scaler> {
        self.state.as_ref().map(|s| &s.scaler)
    }

    pub fn imputer(&self) -> Option<&Imputer> {
        self.state.as_ref().map(|s| &s.imputer)
    }

    /// Training-time entry point.
    ///
    /// The first call fits every component and freezes the feature order.
    /// Later calls reuse the fitted state. The target column, when present,
    /// is encoded and appended after the features.
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<DataFrame> {
        if let Some(state) = &self.state {
            debug!("Preprocessor already fitted, reusing fitted state");
            return Ok(self.apply(state, df, true)?.frame);
        }

        let start = Instant::now();
        let state = self.fit_state(df)?;
        let output = self.apply(&state, df, true)?;

        info!(
            rows = df.height(),
            numeric = state.numeric_columns.len(),
            categorical = state.categorical_columns.len(),
            features = state.feature_columns.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Preprocessor fitted"
        );
        self.state = Some(state);
        Ok(output.frame)
    }

    /// Serving-time entry point: features only, in the frozen order
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        Ok(self.transform_with_diagnostics(df)?.frame)
    }

    /// Like [`transform`](Self::transform) but also returns the degradations
    pub fn transform_with_diagnostics(&self, df: &DataFrame) -> Result<TransformOutput> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| ChurnError::not_fitted("FeaturePreprocessor::transform"))?;
        self.apply(state, df, false)
    }

    /// Split a preprocessed frame into features and target
    pub fn split_features_target(frame: &DataFrame, target: &str) -> Result<(DataFrame, Series)> {
        let target_series = frame
            .column(target)
            .map_err(|_| ChurnError::FeatureNotFound(target.to_string()))?
            .as_materialized_series()
            .clone();
        let features = frame.drop(target)?;
        Ok((features, target_series))
    }

    /// Feature frame to a row-major matrix in canonical order
    pub fn to_matrix(&self, frame: &DataFrame) -> Result<Array2<f64>> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| ChurnError::not_fitted("FeaturePreprocessor::to_matrix"))?;
        frame_to_matrix(frame, &state.feature_columns)
    }

    /// Save the fitted preprocessor
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        if self.state.is_none() {
            return Err(ChurnError::not_fitted("FeaturePreprocessor::save"));
        }
        save_artifact(path, ArtifactKind::Preprocessor, self)
    }

    /// Load a preprocessor saved with [`save`](Self::save)
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let preprocessor: Self = load_artifact(path, ArtifactKind::Preprocessor)?;
        if !preprocessor.is_fitted() {
            return Err(ChurnError::ArtifactUnavailable {
                path: path.display().to_string(),
                reason: "preprocessor was saved unfitted".to_string(),
            });
        }
        Ok(preprocessor)
    }

    fn drop_id_columns(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut result = df.clone();
        for id in &self.config.id_columns {
            if result.column(id).is_ok() {
                result = result.drop(id)?;
            }
        }
        Ok(result)
    }

    fn column_type(&self, column: &Column) -> Result<ColumnType> {
        if self.config.fixed_vocabulary(column.name()).is_some() {
            return Ok(ColumnType::Categorical);
        }
        match column.dtype() {
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 |
            DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 |
            DataType::Float32 | DataType::Float64 | DataType::Null => Ok(ColumnType::Numeric),
            DataType::String | DataType::Categorical(_, _) | DataType::Boolean => {
                Ok(ColumnType::Categorical)
            }
            other => Err(ChurnError::UnsupportedSchema(format!(
                "column '{}' has unsupported type {}",
                column.name(),
                other
            ))),
        }
    }

    /// Build a complete fitted state without touching `self.state`
    fn fit_state(&self, df: &DataFrame) -> Result<FittedState> {
        let df = self.drop_id_columns(df)?;
        let target = self.config.target_column.as_str();

        let mut numeric_columns = Vec::new();
        let mut categorical_columns = Vec::new();
        let mut feature_columns = Vec::new();
        for column in df.get_columns() {
            let name = column.name().to_string();
            if name == target {
                continue;
            }
            match self.column_type(column)? {
                ColumnType::Numeric => numeric_columns.push(name.clone()),
                ColumnType::Categorical => categorical_columns.push(name.clone()),
            }
            feature_columns.push(name);
        }

        if feature_columns.is_empty() {
            return Err(ChurnError::ValidationFailure(
                "no feature columns left after dropping identifier and target".to_string(),
            ));
        }

        let fixed = match &self.config.vocabulary {
            VocabularySource::Fixed(map) => map.clone(),
            VocabularySource::Learned => BTreeMap::new(),
        };

        // A text target gets a fitted fill too, so unlabelled rows take the mode
        let mut imputed_categoricals = categorical_columns.clone();
        if matches!(df.column(target).map(|c| c.dtype().clone()), Ok(DataType::String)) {
            imputed_categoricals.push(target.to_string());
        }

        let imputer = Imputer::new(
            self.config.numeric_impute_strategy.clone(),
            self.config.categorical_impute_strategy.clone(),
        )
        .fit(&df, &numeric_columns, &imputed_categoricals, &fixed)?;
        let imputed = imputer.transform(&df)?;

        let encoders = EncoderRegistry::fit(&imputed, &categorical_columns, &fixed)?;

        let target_encoder = match imputed.column(target) {
            Ok(column) if matches!(column.dtype(), DataType::String) => {
                let values: Vec<&str> = column.str()?.into_iter().flatten().collect();
                Some(LabelEncoder::fit(target, values)?)
            }
            _ => None,
        };

        let (encoded, _) = encoders.transform(&imputed)?;
        let scaled_columns = match self.config.scaling_scope {
            ScalingScope::NumericOnly => numeric_columns.clone(),
            ScalingScope::AllFeatures => feature_columns.clone(),
        };
        let scaler = Scaler::new().fit(&encoded, &scaled_columns)?;

        Ok(FittedState {
            numeric_columns,
            categorical_columns,
            imputer,
            encoders,
            target_encoder,
            scaler,
            feature_columns,
        })
    }

    /// Impute, encode, align and scale with an existing state
    fn apply(&self, state: &FittedState, df: &DataFrame, keep_target: bool) -> Result<TransformOutput> {
        let df = self.drop_id_columns(df)?;
        let imputed = state.imputer.transform(&df)?;
        let (mut encoded, mut degradations) = state.encoders.transform(&imputed)?;

        let target = self.config.target_column.as_str();
        let has_target = keep_target && encoded.column(target).is_ok();
        if has_target {
            if let Some(encoder) = &state.target_encoder {
                let column = encoded.column(target)?.as_materialized_series().clone();
                let (series, mut unseen) = encoder.transform_series(&column)?;
                encoded.with_column(series)?;
                degradations.append(&mut unseen);
            }
        }

        let height = encoded.height();
        let mut ordered: Vec<Column> = Vec::with_capacity(state.feature_columns.len() + 1);
        for name in &state.feature_columns {
            match encoded.column(name) {
                Ok(column) => ordered.push(column.cast(&DataType::Float64)?),
                Err(_) => {
                    debug!(column = %name, "Feature column absent, padding with zeros");
                    ordered.push(Column::new(name.as_str().into(), vec![0.0f64; height]));
                }
            }
        }
        if has_target {
            ordered.push(encoded.column(target)?.clone());
        }
        let aligned = DataFrame::new(ordered)?;

        let frame = scale_or_degrade(&state.scaler, aligned, &mut degradations);
        Ok(TransformOutput {
            frame,
            degradations,
        })
    }
}

impl Default for FeaturePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Scale `frame`, falling back to the unscaled frame when scaling fails
pub(crate) fn scale_or_degrade(
    scaler: &Scaler,
    frame: DataFrame,
    degradations: &mut Vec<Degradation>,
) -> DataFrame {
    match scaler.transform(&frame) {
        Ok(scaled) => scaled,
        Err(err) => {
            warn!(error = %err, "Scaling failed, returning unscaled features");
            degradations.push(Degradation::ScalingDegraded {
                reason: err.to_string(),
            });
            frame
        }
    }
}

/// Select `columns` from `df` as an (n_rows, n_columns) matrix
pub fn frame_to_matrix(df: &DataFrame, columns: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let mut data = Array2::zeros((n_rows, columns.len()));

    for (j, name) in columns.iter().enumerate() {
        let column = df
            .column(name)
            .map_err(|_| ChurnError::FeatureNotFound(name.clone()))?
            .cast(&DataType::Float64)?;
        for (i, value) in column.f64()?.into_iter().enumerate() {
            data[[i, j]] = value.unwrap_or(0.0);
        }
    }

    Ok(data)
}

/// An encoded target series as a label vector
pub fn target_to_vector(series: &Series) -> Result<Array1<f64>> {
    let casted = series.cast(&DataType::Float64)?;
    let values = casted
        .f64()?
        .into_iter()
        .map(|v| {
            v.ok_or_else(|| ChurnError::DataError(format!("missing label in '{}'", series.name())))
        })
        .collect::<Result<Vec<f64>>>()?;
    Ok(Array1::from(values))
}

/// Raw customer rows spanning the fixed vocabularies and typical charges
fn reference_sample() -> Result<DataFrame> {
    const CODES: [usize; 7] = [0, 1, 2, 0, 1, 2, 0];
    const PAYMENT_CODES: [usize; 7] = [0, 1, 2, 3, 0, 1, 2];

    let vocabularies = schema::churn_vocabularies();
    let mut columns = vec![
        Column::new("tenure".into(), &[1.0, 12.0, 24.0, 36.0, 48.0, 60.0, 72.0]),
        Column::new(
            "monthly_charges".into(),
            &[20.0, 40.0, 60.0, 80.0, 100.0, 120.0, 140.0],
        ),
        Column::new(
            "total_charges".into(),
            &[20.0, 500.0, 1500.0, 3000.0, 5000.0, 7500.0, 10000.0],
        ),
    ];

    for name in schema::CATEGORICAL_FEATURES {
        let vocabulary = vocabularies
            .get(name)
            .ok_or_else(|| ChurnError::FeatureNotFound(name.to_string()))?;
        let codes: &[usize] = if name == "payment_method" {
            &PAYMENT_CODES
        } else {
            &CODES
        };
        let values: Vec<&str> = codes
            .iter()
            .map(|&c| vocabulary[c % vocabulary.len()].as_str())
            .collect();
        columns.push(Column::new(name.into(), values));
    }

    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::imputer::FillValue;

    fn create_test_dataframe() -> DataFrame {
        df! {
            "customer_id" => &["C1", "C2", "C3", "C4", "C5", "C6"],
            "tenure" => &[Some(1.0), Some(24.0), None, Some(48.0), Some(6.0), Some(60.0)],
            "monthly_charges" => &[80.0, 55.0, 90.0, 30.0, 70.0, 35.0],
            "contract_type" => &[Some("Month-to-month"), Some("One year"), Some("Month-to-month"), None, Some("Month-to-month"), Some("Two year")],
            "tech_support" => &["No", "Yes", "No", "Yes", "No", "Yes"],
            "churn" => &["Yes", "No", "Yes", "No", "Yes", "No"],
        }
        .unwrap()
    }

    #[test]
    fn test_preprocessor_creation() {
        let preprocessor = FeaturePreprocessor::new();
        assert!(!preprocessor.is_fitted());
        assert!(preprocessor.feature_columns().is_empty());
    }

    #[test]
    fn test_fit_transform_partitions_and_orders() {
        let mut preprocessor = FeaturePreprocessor::new();
        let out = preprocessor.fit_transform(&create_test_dataframe()).unwrap();

        assert_eq!(
            preprocessor.feature_columns(),
            &["tenure", "monthly_charges", "contract_type", "tech_support"]
        );
        assert_eq!(preprocessor.numeric_columns(), &["tenure", "monthly_charges"]);
        assert_eq!(preprocessor.categorical_columns(), &["contract_type", "tech_support"]);

        let names: Vec<String> = out.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["tenure", "monthly_charges", "contract_type", "tech_support", "churn"]);
        assert_eq!(out.column("tenure").unwrap().null_count(), 0);

        let churn = out.column("churn").unwrap().f64().unwrap();
        assert_eq!(churn.get(0), Some(1.0));
        assert_eq!(churn.get(1), Some(0.0));
    }

    #[test]
    fn test_transform_before_fit() {
        let preprocessor = FeaturePreprocessor::new();
        let err = preprocessor.transform(&create_test_dataframe()).unwrap_err();
        assert!(matches!(err, ChurnError::NotFitted { .. }));
    }

    #[test]
    fn test_second_fit_reuses_state() {
        let mut preprocessor = FeaturePreprocessor::new();
        preprocessor.fit_transform(&create_test_dataframe()).unwrap();
        let mean_before = preprocessor.scaler().unwrap().params("tenure").unwrap().mean;

        let other = df! {
            "tenure" => &[100.0, 200.0],
            "monthly_charges" => &[10.0, 20.0],
            "contract_type" => &["Two year", "Two year"],
            "tech_support" => &["No", "No"],
        }
        .unwrap();
        preprocessor.fit_transform(&other).unwrap();

        let mean_after = preprocessor.scaler().unwrap().params("tenure").unwrap().mean;
        assert_eq!(mean_before, mean_after);
        assert_eq!(preprocessor.feature_columns().len(), 4);
    }

    #[test]
    fn test_transform_reorders_and_pads() {
        let mut preprocessor = FeaturePreprocessor::new();
        preprocessor.fit_transform(&create_test_dataframe()).unwrap();

        let serving = df! {
            "tech_support" => &["Yes"],
            "monthly_charges" => &[50.0],
            "tenure" => &[12.0],
        }
        .unwrap();
        let out = preprocessor.transform(&serving).unwrap();

        let names: Vec<String> = out.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, preprocessor.feature_columns());
        assert_eq!(out.column("contract_type").unwrap().f64().unwrap().get(0), Some(0.0));
    }

    #[test]
    fn test_scaling_failure_degrades() {
        let df = df! { "a" => &[1.0, 2.0] }.unwrap();
        let scaler = Scaler::new().fit(&df, &["a".to_string()]).unwrap();

        let frame = df! { "b" => &[5.0] }.unwrap();
        let mut degradations = Vec::new();
        let out = scale_or_degrade(&scaler, frame.clone(), &mut degradations);

        assert!(out.equals(&frame));
        assert!(matches!(degradations[0], Degradation::ScalingDegraded { .. }));
    }

    #[test]
    fn test_reference_preprocessor() {
        let preprocessor = FeaturePreprocessor::churn_reference().unwrap();
        assert_eq!(preprocessor.feature_columns(), schema::feature_columns().as_slice());
        assert_eq!(preprocessor.scaler().unwrap().columns().len(), 13);
        assert_eq!(preprocessor.encoder("payment_method").unwrap().len(), 4);
    }

    #[test]
    fn test_to_matrix() {
        let mut preprocessor = FeaturePreprocessor::new();
        let out = preprocessor.fit_transform(&create_test_dataframe()).unwrap();
        let (features, target) = FeaturePreprocessor::split_features_target(&out, "churn").unwrap();

        let x = preprocessor.to_matrix(&features).unwrap();
        let y = target_to_vector(&target).unwrap();
        assert_eq!(x.dim(), (6, 4));
        assert_eq!(y.len(), 6);
    }

    #[test]
    fn test_missing_label_takes_majority_class() {
        let df = df! {
            "tenure" => &[1.0, 2.0, 3.0, 4.0, 5.0],
            "contract_type" => &["Month-to-month", "One year", "Two year", "One year", "Two year"],
            "churn" => &[Some("Yes"), Some("Yes"), Some("Yes"), Some("No"), None],
        }
        .unwrap();

        let mut preprocessor = FeaturePreprocessor::new();
        let out = preprocessor.fit_transform(&df).unwrap();

        let churn = out.column("churn").unwrap().f64().unwrap();
        assert_eq!(churn.null_count(), 0);
        assert_eq!(churn.get(4), Some(1.0));
        assert_eq!(
            preprocessor.imputer().unwrap().fill_value("churn"),
            Some(&FillValue::Text("Yes".to_string()))
        );

        // serving frames carry no target and stay untouched by its fill
        let serving = df.drop("churn").unwrap();
        let features = preprocessor.transform(&serving).unwrap();
        assert!(features.column("churn").is_err());
    }
}
