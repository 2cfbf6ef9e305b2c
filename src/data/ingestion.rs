//! Tabular data ingestion

use std::fs::File;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{ChurnError, Result};

/// Share of missing cells above which a frame is rejected
pub const MAX_MISSING_RATIO: f64 = 0.5;

/// A source of raw customer records
pub trait DataSource: Send + Sync {
    /// Read and validate the full frame
    fn load(&self) -> Result<DataFrame>;

    /// Human-readable location, used in logs
    fn describe(&self) -> String;
}

/// CSV file with a header row; column types are inferred
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    infer_schema_length: Option<usize>,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            infer_schema_length: Some(1000),
        }
    }

    /// Number of rows scanned for type inference; `None` scans everything
    pub fn with_infer_schema_length(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_length = rows;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataSource for CsvSource {
    fn load(&self) -> Result<DataFrame> {
        info!(path = %self.path.display(), "Loading CSV data");
        let file = File::open(&self.path)?;

        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .into_reader_with_file_handle(file)
            .finish()?;

        validate(&frame, &[])?;
        info!(rows = frame.height(), columns = frame.width(), "Loaded data");
        Ok(frame)
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }
}

/// Pick a source by file extension (case-insensitive); only `.csv` is known
pub fn source_for_path(path: impl AsRef<Path>) -> Result<Box<dyn DataSource>> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => Ok(Box::new(CsvSource::new(path))),
        other => {
            warn!(path = %path.display(), extension = other, "Unsupported data file type");
            Err(ChurnError::UnsupportedSchema(format!(
                "unsupported file extension '.{}' for {}",
                other,
                path.display()
            )))
        }
    }
}

/// Load a file through [`source_for_path`]
pub fn load_path(path: impl AsRef<Path>) -> Result<DataFrame> {
    source_for_path(path)?.load()
}

/// Nulls plus NaN floats across all cells
pub fn missing_cells(frame: &DataFrame) -> usize {
    frame
        .get_columns()
        .iter()
        .map(|column| {
            let nan = match column.dtype() {
                DataType::Float32 | DataType::Float64 => column
                    .cast(&DataType::Float64)
                    .ok()
                    .and_then(|c| c.f64().ok().map(|ca| ca.into_iter().flatten().filter(|v| v.is_nan()).count()))
                    .unwrap_or(0),
                _ => 0,
            };
            column.null_count() + nan
        })
        .sum()
}

/// Reject empty or mostly-missing frames and frames lacking `required_columns`
pub fn validate(frame: &DataFrame, required_columns: &[&str]) -> Result<()> {
    if frame.height() == 0 || frame.width() == 0 {
        return Err(ChurnError::ValidationFailure("data is empty".to_string()));
    }

    let missing: Vec<&str> = required_columns
        .iter()
        .copied()
        .filter(|name| frame.column(name).is_err())
        .collect();
    if !missing.is_empty() {
        return Err(ChurnError::UnsupportedSchema(format!(
            "missing required columns: {}",
            missing.join(", ")
        )));
    }

    let total = frame.height() * frame.width();
    let ratio = missing_cells(frame) as f64 / total as f64;
    if ratio > MAX_MISSING_RATIO {
        return Err(ChurnError::ValidationFailure(format!(
            "too many missing values: {:.2}%",
            ratio * 100.0
        )));
    }

    debug!(missing_pct = ratio * 100.0, "Data validation passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_factory_by_extension() {
        assert!(source_for_path("data/customers.csv").is_ok());
        assert!(source_for_path("data/CUSTOMERS.CSV").is_ok());
        assert!(matches!(
            source_for_path("data/customers.parquet").err(),
            Some(ChurnError::UnsupportedSchema(_))
        ));
        assert!(matches!(
            source_for_path("data/customers").err(),
            Some(ChurnError::UnsupportedSchema(_))
        ));
    }

    #[test]
    fn test_csv_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "customer_id,tenure,contract_type").unwrap();
        writeln!(file, "CUST000000,12,Month-to-month").unwrap();
        writeln!(file, "CUST000001,40,Two year").unwrap();
        drop(file);

        let frame = load_path(&path).unwrap();
        assert_eq!(frame.shape(), (2, 3));
        assert!(frame.column("tenure").unwrap().dtype().is_integer());
    }

    #[test]
    fn test_validate_empty() {
        let frame = DataFrame::empty();
        assert!(matches!(validate(&frame, &[]), Err(ChurnError::ValidationFailure(_))));
    }

    #[test]
    fn test_validate_sparse() {
        let frame = df! {
            "a" => [Some(1.0), None, None, Some(f64::NAN)],
            "b" => [None::<&str>, None, Some("x"), Some("y")],
        }
        .unwrap();
        // 5 of 8 cells missing
        assert!(matches!(validate(&frame, &[]), Err(ChurnError::ValidationFailure(_))));
    }

    #[test]
    fn test_validate_half_missing_passes() {
        let frame = df! {
            "a" => [Some(1.0), None],
            "b" => [None::<&str>, Some("x")],
        }
        .unwrap();
        assert!(validate(&frame, &[]).is_ok());
    }

    #[test]
    fn test_validate_required_columns() {
        let frame = df! { "tenure" => [1i64, 2] }.unwrap();
        assert!(validate(&frame, &["tenure"]).is_ok());
        assert!(matches!(
            validate(&frame, &["tenure", "churn"]),
            Err(ChurnError::UnsupportedSchema(_))
        ));
    }
}
