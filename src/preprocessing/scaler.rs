//! Standard scaling: `(x - mean) / std` with statistics frozen at fit time

use ndarray::{Array2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ChurnError, Result};

/// Fitted statistics for one column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub mean: f64,
    /// Population standard deviation; 1.0 when the column is constant
    pub std: f64,
}

/// Feature scaler
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scaler {
    columns: Vec<String>,
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

impl Scaler {
    /// Create a new, unfit scaler
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute column statistics and return them as a new fitted scaler
    pub fn fit(&self, df: &DataFrame, columns: &[String]) -> Result<Scaler> {
        let mut params = Vec::with_capacity(columns.len());

        for name in columns {
            let column = df
                .column(name)
                .map_err(|_| ChurnError::FeatureNotFound(name.clone()))?;
            let casted = column.cast(&DataType::Float64)?;
            let ca = casted.f64()?;

            let mean = ca.mean().unwrap_or(0.0);
            let std = ca.std(0).unwrap_or(0.0);
            params.push(ScalerParams {
                mean,
                std: if std == 0.0 || !std.is_finite() { 1.0 } else { std },
            });
        }

        Ok(Scaler {
            columns: columns.to_vec(),
            params,
            is_fitted: true,
        })
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn params(&self, column: &str) -> Option<ScalerParams> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.params[i])
    }

    /// Scale every fitted column of `df`; a missing fitted column is an error
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(ChurnError::not_fitted("Scaler::transform"));
        }

        let replacements = self
            .columns
            .iter()
            .zip(&self.params)
            .map(|(name, params)| {
                let column = df
                    .column(name)
                    .map_err(|_| ChurnError::FeatureNotFound(name.clone()))?;
                scale_series(column.as_materialized_series(), params)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut result = df.clone();
        for scaled in replacements {
            result.with_column(scaled)?;
        }

        Ok(result)
    }

    /// Scale a matrix whose columns are in fitted order
    pub fn transform_array(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(ChurnError::not_fitted("Scaler::transform_array"));
        }
        if x.ncols() != self.columns.len() {
            return Err(ChurnError::ShapeMismatch {
                expected: format!("{} columns", self.columns.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut result = x.clone();
        for (j, mut col) in result.axis_iter_mut(Axis(1)).enumerate() {
            let p = self.params[j];
            col.mapv_inplace(|v| (v - p.mean) / p.std);
        }
        Ok(result)
    }
}

fn scale_series(series: &Series, params: &ScalerParams) -> Result<Series> {
    let casted = series.cast(&DataType::Float64)?;
    let scaled: Float64Chunked = casted
        .f64()?
        .into_iter()
        .map(|opt| opt.map(|v| (v - params.mean) / params.std))
        .collect();

    Ok(scaled.with_name(series.name().clone()).into_series())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_standard_scaler() {
        let df = df! {
            "a" => &[1.0, 2.0, 3.0, 4.0, 5.0],
            "b" => &[10.0, 20.0, 30.0, 40.0, 50.0],
        }
        .unwrap();

        let scaler = Scaler::new().fit(&df, &cols(&["a", "b"])).unwrap();
        let result = scaler.transform(&df).unwrap();

        let a = result.column("a").unwrap().f64().unwrap();
        let mean: f64 = a.mean().unwrap();
        assert!(mean.abs() < 1e-10);

        let p = scaler.params("a").unwrap();
        assert!((p.mean - 3.0).abs() < 1e-12);
        assert!((p.std - 2.0_f64.sqrt()).abs() < 1e-12);
        assert!((a.get(0).unwrap() - (1.0 - 3.0) / 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_uses_fitted_statistics() {
        let train = df! { "a" => &[0.0, 2.0, 4.0] }.unwrap();
        let scaler = Scaler::new().fit(&train, &cols(&["a"])).unwrap();
        let p = scaler.params("a").unwrap();

        let serving = df! { "a" => &[100.0] }.unwrap();
        let out = scaler.transform(&serving).unwrap();
        let v = out.column("a").unwrap().f64().unwrap().get(0).unwrap();
        assert!((v - (100.0 - p.mean) / p.std).abs() < 1e-12);
    }

    #[test]
    fn test_constant_column() {
        let df = df! { "c" => &[7.0, 7.0, 7.0] }.unwrap();
        let scaler = Scaler::new().fit(&df, &cols(&["c"])).unwrap();
        assert_eq!(scaler.params("c").unwrap().std, 1.0);
        let out = scaler.transform(&df).unwrap();
        assert_eq!(out.column("c").unwrap().f64().unwrap().get(0), Some(0.0));
    }

    #[test]
    fn test_not_fitted() {
        let df = df! { "a" => &[1.0] }.unwrap();
        let err = Scaler::new().transform(&df).unwrap_err();
        assert!(matches!(err, ChurnError::NotFitted { .. }));
    }

    #[test]
    fn test_missing_column_errors() {
        let df = df! { "a" => &[1.0, 2.0] }.unwrap();
        let scaler = Scaler::new().fit(&df, &cols(&["a"])).unwrap();
        let other = df! { "b" => &[1.0] }.unwrap();
        assert!(matches!(
            scaler.transform(&other).unwrap_err(),
            ChurnError::FeatureNotFound(_)
        ));
    }

    #[test]
    fn test_array_shape_mismatch() {
        let df = df! { "a" => &[1.0, 3.0] }.unwrap();
        let scaler = Scaler::new().fit(&df, &cols(&["a"])).unwrap();

        let ok = scaler.transform_array(&array![[1.0], [3.0]]).unwrap();
        assert_eq!(ok[[0, 0]], -1.0);

        let err = scaler.transform_array(&array![[1.0, 2.0]]).unwrap_err();
        assert!(matches!(err, ChurnError::ShapeMismatch { .. }));
    }
}
