//! Missing value imputation
//!
//! Fill values are computed once by [`Imputer::fit`] and stored in the
//! returned imputer, so training and serving fill the same gaps with the
//! same values.

use std::collections::BTreeMap;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ChurnError, Result};

/// Sentinel used when a categorical column has no observed value at all
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Strategy for imputing missing values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace with mean (numeric only)
    Mean,
    /// Replace with median (numeric only)
    Median,
    /// Replace with mode / most frequent value
    MostFrequent,
    /// Replace with a constant value (numeric only)
    Constant(f64),
    /// Replace with a constant string (categorical only)
    ConstantString(String),
}

/// A fitted fill value for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FillValue {
    Numeric(f64),
    Text(String),
}

/// Imputer for handling missing values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    numeric_strategy: ImputeStrategy,
    categorical_strategy: ImputeStrategy,
    fill_values: BTreeMap<String, FillValue>,
    is_fitted: bool,
}

impl Imputer {
    /// Create an unfit imputer with per-kind strategies
    pub fn new(numeric_strategy: ImputeStrategy, categorical_strategy: ImputeStrategy) -> Self {
        Self {
            numeric_strategy,
            categorical_strategy,
            fill_values: BTreeMap::new(),
            is_fitted: false,
        }
    }

    /// Compute fill values and return them as a new fitted imputer.
    ///
    /// `vocabularies` supplies the fallback for a categorical column with no
    /// observed values (its first entry); otherwise [`UNKNOWN_CATEGORY`] is used.
    pub fn fit(
        &self,
        df: &DataFrame,
        numeric_columns: &[String],
        categorical_columns: &[String],
        vocabularies: &BTreeMap<String, Vec<String>>,
    ) -> Result<Imputer> {
        let mut fill_values = BTreeMap::new();

        for name in numeric_columns {
            let values = numeric_values(df, name)?;
            let fill = numeric_fill(&self.numeric_strategy, name, &values)?;
            fill_values.insert(name.clone(), FillValue::Numeric(fill));
        }

        for name in categorical_columns {
            let values = text_values(df, name)?;
            let fallback = vocabularies
                .get(name)
                .and_then(|v| v.first().cloned())
                .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string());
            let fill = text_fill(&self.categorical_strategy, name, &values, fallback)?;
            fill_values.insert(name.clone(), FillValue::Text(fill));
        }

        Ok(Imputer {
            numeric_strategy: self.numeric_strategy.clone(),
            categorical_strategy: self.categorical_strategy.clone(),
            fill_values,
            is_fitted: true,
        })
    }

    /// Fill missing values in every fitted column present in `df`.
    ///
    /// Columns absent from `df` are skipped; the preprocessor pads them later.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(ChurnError::not_fitted("Imputer::transform"));
        }

        let mut result = df.clone();
        for (name, fill) in &self.fill_values {
            let Ok(column) = df.column(name) else {
                continue;
            };
            let filled = fill_series(column.as_materialized_series(), fill)?;
            result.with_column(filled)?;
        }

        Ok(result)
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn fill_value(&self, column: &str) -> Option<&FillValue> {
        self.fill_values.get(column)
    }
}

fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| ChurnError::FeatureNotFound(name.to_string()))?;
    let casted = column.cast(&DataType::Float64)?;
    Ok(casted
        .f64()?
        .into_iter()
        .flatten()
        .filter(|v| !v.is_nan())
        .collect())
}

fn text_values(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let column = df
        .column(name)
        .map_err(|_| ChurnError::FeatureNotFound(name.to_string()))?;
    let casted = column.cast(&DataType::String)?;
    Ok(casted
        .str()?
        .into_iter()
        .flatten()
        .map(|s| s.to_string())
        .collect())
}

fn numeric_fill(strategy: &ImputeStrategy, column: &str, values: &[f64]) -> Result<f64> {
    let fill = match strategy {
        ImputeStrategy::Mean => {
            let ca = Float64Chunked::from_vec("v".into(), values.to_vec());
            ca.mean()
        }
        ImputeStrategy::Median => {
            let ca = Float64Chunked::from_vec("v".into(), values.to_vec());
            ca.median()
        }
        ImputeStrategy::MostFrequent => {
            let mut counts: BTreeMap<u64, usize> = BTreeMap::new();
            for v in values {
                *counts.entry(v.to_bits()).or_insert(0) += 1;
            }
            most_frequent(counts).map(f64::from_bits)
        }
        ImputeStrategy::Constant(v) => Some(*v),
        ImputeStrategy::ConstantString(v) => {
            return Err(ChurnError::InvalidParameter {
                name: format!("impute_strategy[{}]", column),
                value: v.clone(),
                reason: "string constant cannot fill a numeric column".to_string(),
            })
        }
    };
    Ok(fill.filter(|v| v.is_finite()).unwrap_or(0.0))
}

fn text_fill(
    strategy: &ImputeStrategy,
    column: &str,
    values: &[String],
    fallback: String,
) -> Result<String> {
    match strategy {
        ImputeStrategy::MostFrequent => {
            let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
            for v in values {
                *counts.entry(v.as_str()).or_insert(0) += 1;
            }
            Ok(most_frequent(counts)
                .map(|s| s.to_string())
                .unwrap_or(fallback))
        }
        ImputeStrategy::ConstantString(v) => Ok(v.clone()),
        other => Err(ChurnError::InvalidParameter {
            name: format!("impute_strategy[{}]", column),
            value: format!("{:?}", other),
            reason: "categorical columns support MostFrequent or ConstantString".to_string(),
        }),
    }
}

/// Key with the highest count; ties go to the smallest key.
fn most_frequent<K: Ord + Copy>(counts: BTreeMap<K, usize>) -> Option<K> {
    let mut best: Option<(K, usize)> = None;
    for (key, count) in counts {
        match best {
            Some((_, c)) if count <= c => {}
            _ => best = Some((key, count)),
        }
    }
    best.map(|(k, _)| k)
}

fn fill_series(series: &Series, fill: &FillValue) -> Result<Series> {
    match fill {
        FillValue::Numeric(val) => {
            let casted = series.cast(&DataType::Float64)?;
            let filled: Float64Chunked = casted
                .f64()?
                .into_iter()
                .map(|opt| match opt {
                    Some(v) if !v.is_nan() => Some(v),
                    _ => Some(*val),
                })
                .collect();
            Ok(filled.with_name(series.name().clone()).into_series())
        }
        FillValue::Text(val) => {
            let casted = series.cast(&DataType::String)?;
            let filled: StringChunked = casted
                .str()?
                .into_iter()
                .map(|opt| Some(opt.unwrap_or(val.as_str()).to_string()))
                .collect();
            Ok(filled.with_name(series.name().clone()).into_series())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_imputer() -> Imputer {
        Imputer::new(ImputeStrategy::Median, ImputeStrategy::MostFrequent)
    }

    fn sample() -> DataFrame {
        df! {
            "tenure" => &[Some(1.0), None, Some(5.0), Some(3.0)],
            "contract_type" => &[Some("One year"), Some("Two year"), None, Some("Two year")],
        }
        .unwrap()
    }

    #[test]
    fn test_median_and_mode() {
        let df = sample();
        let imputer = default_imputer()
            .fit(
                &df,
                &["tenure".to_string()],
                &["contract_type".to_string()],
                &BTreeMap::new(),
            )
            .unwrap();

        assert_eq!(imputer.fill_value("tenure"), Some(&FillValue::Numeric(3.0)));
        assert_eq!(
            imputer.fill_value("contract_type"),
            Some(&FillValue::Text("Two year".to_string()))
        );

        let out = imputer.transform(&df).unwrap();
        assert_eq!(out.column("tenure").unwrap().null_count(), 0);
        assert_eq!(out.column("contract_type").unwrap().null_count(), 0);
        assert_eq!(out.column("tenure").unwrap().f64().unwrap().get(1), Some(3.0));
    }

    #[test]
    fn test_idempotent() {
        let df = sample();
        let imputer = default_imputer()
            .fit(
                &df,
                &["tenure".to_string()],
                &["contract_type".to_string()],
                &BTreeMap::new(),
            )
            .unwrap();

        let once = imputer.transform(&df).unwrap();
        let twice = imputer.transform(&once).unwrap();
        assert!(once.equals(&twice));
    }

    #[test]
    fn test_all_missing_fallbacks() {
        let df = df! {
            "total_charges" => &[None::<f64>, None],
            "payment_method" => &[None::<&str>, None],
            "tech_support" => &[None::<&str>, None],
        }
        .unwrap();

        let mut vocab = BTreeMap::new();
        vocab.insert("tech_support".to_string(), vec!["No".to_string(), "Yes".to_string()]);

        let imputer = default_imputer()
            .fit(
                &df,
                &["total_charges".to_string()],
                &["payment_method".to_string(), "tech_support".to_string()],
                &vocab,
            )
            .unwrap();

        assert_eq!(imputer.fill_value("total_charges"), Some(&FillValue::Numeric(0.0)));
        assert_eq!(
            imputer.fill_value("payment_method"),
            Some(&FillValue::Text(UNKNOWN_CATEGORY.to_string()))
        );
        assert_eq!(
            imputer.fill_value("tech_support"),
            Some(&FillValue::Text("No".to_string()))
        );
    }

    #[test]
    fn test_nan_is_missing() {
        let df = df! { "x" => &[1.0, f64::NAN, 3.0] }.unwrap();
        let imputer = default_imputer()
            .fit(&df, &["x".to_string()], &[], &BTreeMap::new())
            .unwrap();
        let out = imputer.transform(&df).unwrap();
        assert_eq!(out.column("x").unwrap().f64().unwrap().get(1), Some(2.0));
    }

    #[test]
    fn test_mode_tie_breaks_lexicographically() {
        let df = df! { "c" => &["b", "a", "b", "a"] }.unwrap();
        let imputer = default_imputer()
            .fit(&df, &[], &["c".to_string()], &BTreeMap::new())
            .unwrap();
        assert_eq!(imputer.fill_value("c"), Some(&FillValue::Text("a".to_string())));
    }

    #[test]
    fn test_transform_before_fit() {
        let err = default_imputer().transform(&sample()).unwrap_err();
        assert!(matches!(err, ChurnError::NotFitted { .. }));
    }

    #[test]
    fn test_skips_absent_columns() {
        let df = sample();
        let imputer = default_imputer()
            .fit(
                &df,
                &["tenure".to_string()],
                &["contract_type".to_string()],
                &BTreeMap::new(),
            )
            .unwrap();
        let partial = df.drop("contract_type").unwrap();
        let out = imputer.transform(&partial).unwrap();
        assert_eq!(out.width(), 1);
    }
}
