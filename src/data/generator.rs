//! Synthetic customer data
//!
//! Churn risk rises with month-to-month contracts, monthly charges above 70
//! and customers without any add-on service.

use std::fs::File;
use std::path::Path;

use polars::prelude::*;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ChurnError, Result};
use crate::preprocessing::schema::{ID_COLUMN, SERVICE_FEATURES, TARGET_COLUMN};

const CONTRACTS: [(&str, f64); 3] = [("Month-to-month", 0.5), ("One year", 0.3), ("Two year", 0.2)];
const PAYMENTS: [(&str, f64); 4] = [
    ("Electronic check", 0.3),
    ("Mailed check", 0.2),
    ("Bank transfer (automatic)", 0.25),
    ("Credit card (automatic)", 0.25),
];
const INTERNET: [(&str, f64); 3] = [("DSL", 0.3), ("Fiber optic", 0.4), ("No", 0.3)];
const NO_INTERNET_SERVICE: &str = "No internet service";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub n_rows: usize,
    pub seed: u64,
    /// Rows whose total_charges is blanked
    pub missing_total_charges: usize,
    /// Rows whose payment_method is blanked
    pub missing_payment_method: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            n_rows: 1000,
            seed: 42,
            missing_total_charges: 50,
            missing_payment_method: 30,
        }
    }
}

impl GeneratorConfig {
    pub fn with_rows(mut self, n_rows: usize) -> Self {
        self.n_rows = n_rows;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_missing(mut self, total_charges: usize, payment_method: usize) -> Self {
        self.missing_total_charges = total_charges;
        self.missing_payment_method = payment_method;
        self
    }
}

fn normal(mean: f64, std: f64) -> Result<Normal<f64>> {
    Normal::new(mean, std).map_err(|e| ChurnError::InvalidParameter {
        name: "normal".to_string(),
        value: format!("N({}, {})", mean, std),
        reason: e.to_string(),
    })
}

fn choose<'a>(rng: &mut impl Rng, options: &[(&'a str, f64)]) -> &'a str {
    let mut draw: f64 = rng.gen();
    for (value, p) in options {
        if draw < *p {
            return value;
        }
        draw -= p;
    }
    options[options.len() - 1].0
}

/// Generate `config.n_rows` customers in the raw ingestion schema
pub fn generate_customer_data(config: &GeneratorConfig) -> Result<DataFrame> {
    let n = config.n_rows;
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let charges = normal(65.0, 30.0)?;
    let drift = normal(0.0, 0.1)?;

    let customer_ids: Vec<String> = (0..n).map(|i| format!("CUST{:06}", i)).collect();
    let tenure: Vec<i64> = (0..n).map(|_| rng.gen_range(1..=72)).collect();
    let monthly: Vec<f64> = (0..n).map(|_| charges.sample(&mut rng).clamp(20.0, 120.0)).collect();
    let mut total: Vec<Option<f64>> = monthly
        .iter()
        .zip(&tenure)
        .map(|(m, t)| Some((m * *t as f64 * (1.0 + drift.sample(&mut rng))).max(0.0)))
        .collect();

    let contract: Vec<&str> = (0..n).map(|_| choose(&mut rng, &CONTRACTS)).collect();
    let mut payment: Vec<Option<&str>> = (0..n).map(|_| Some(choose(&mut rng, &PAYMENTS))).collect();
    let paperless: Vec<&str> = (0..n)
        .map(|_| if rng.gen_bool(0.6) { "Yes" } else { "No" })
        .collect();
    let internet: Vec<&str> = (0..n).map(|_| choose(&mut rng, &INTERNET)).collect();

    let services: Vec<Vec<&str>> = SERVICE_FEATURES
        .iter()
        .map(|_| {
            internet
                .iter()
                .map(|&service| {
                    if service == "No" {
                        NO_INTERNET_SERVICE
                    } else if rng.gen_bool(0.4) {
                        "Yes"
                    } else {
                        "No"
                    }
                })
                .collect()
        })
        .collect();

    let churn: Vec<&str> = (0..n)
        .map(|i| {
            let no_add_ons = services.iter().all(|column| column[i] != "Yes");
            let p = 0.3 * f64::from(u8::from(contract[i] == "Month-to-month"))
                + 0.2 * f64::from(u8::from(monthly[i] > 70.0))
                + 0.2 * f64::from(u8::from(no_add_ons));
            if rng.gen_bool(p.clamp(0.0, 1.0)) {
                "Yes"
            } else {
                "No"
            }
        })
        .collect();

    for i in sample(&mut rng, n, config.missing_total_charges.min(n)).into_iter() {
        total[i] = None;
    }
    for i in sample(&mut rng, n, config.missing_payment_method.min(n)).into_iter() {
        payment[i] = None;
    }

    let mut columns = vec![
        Column::new(ID_COLUMN.into(), customer_ids),
        Column::new("tenure".into(), tenure),
        Column::new("monthly_charges".into(), monthly),
        Column::new("total_charges".into(), total),
        Column::new("contract_type".into(), contract),
        Column::new("payment_method".into(), payment),
        Column::new("paperless_billing".into(), paperless),
        Column::new("internet_service".into(), internet),
    ];
    for (name, values) in SERVICE_FEATURES.iter().zip(services) {
        columns.push(Column::new((*name).into(), values));
    }
    columns.push(Column::new(TARGET_COLUMN.into(), churn));

    let frame = DataFrame::new(columns)?;
    info!(rows = n, seed = config.seed, "Generated synthetic customer data");
    Ok(frame)
}

/// Write a frame as CSV with a header row, creating parent directories
pub fn write_csv(frame: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(frame)?;
    info!(path = %path.display(), rows = frame.height(), "Data written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ingestion::{load_path, missing_cells};
    use crate::preprocessing::schema::feature_columns;

    #[test]
    fn test_schema_and_missing_counts() {
        let frame = generate_customer_data(&GeneratorConfig::default().with_rows(200)).unwrap();
        assert_eq!(frame.height(), 200);
        assert_eq!(frame.width(), 15);
        for name in feature_columns() {
            assert!(frame.column(&name).is_ok(), "missing {}", name);
        }
        assert_eq!(frame.column("total_charges").unwrap().null_count(), 50);
        assert_eq!(frame.column("payment_method").unwrap().null_count(), 30);
    }

    #[test]
    fn test_value_ranges() {
        let frame = generate_customer_data(&GeneratorConfig::default().with_rows(300)).unwrap();
        let monthly = frame.column("monthly_charges").unwrap().f64().unwrap().clone();
        assert!(monthly.into_iter().flatten().all(|m| (20.0..=120.0).contains(&m)));

        let tenure = frame.column("tenure").unwrap().i64().unwrap().clone();
        assert!(tenure.into_iter().flatten().all(|t| (1..=72).contains(&t)));

        let internet = frame.column("internet_service").unwrap().str().unwrap().clone();
        let security = frame.column("online_security").unwrap().str().unwrap().clone();
        for (i, s) in internet.into_iter().zip(security.into_iter()) {
            if i == Some("No") {
                assert_eq!(s, Some(NO_INTERNET_SERVICE));
            } else {
                assert_ne!(s, Some(NO_INTERNET_SERVICE));
            }
        }
    }

    #[test]
    fn test_monthly_charges_centered() {
        let frame = generate_customer_data(&GeneratorConfig::default().with_rows(2000)).unwrap();
        let monthly = frame.column("monthly_charges").unwrap().f64().unwrap().clone();
        let mean = monthly.mean().unwrap();
        assert!((58.0..74.0).contains(&mean), "mean monthly charge {}", mean);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let config = GeneratorConfig::default().with_rows(50).with_missing(5, 5);
        let a = generate_customer_data(&config).unwrap();
        let b = generate_customer_data(&config).unwrap();
        assert!(a.equals_missing(&b));
    }

    #[test]
    fn test_missing_capped_at_rows() {
        let frame = generate_customer_data(&GeneratorConfig::default().with_rows(10)).unwrap();
        assert_eq!(frame.column("total_charges").unwrap().null_count(), 10);
    }

    #[test]
    fn test_write_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("customers.csv");
        let mut frame = generate_customer_data(&GeneratorConfig::default().with_rows(100)).unwrap();
        write_csv(&mut frame, &path).unwrap();

        let loaded = load_path(&path).unwrap();
        assert_eq!(loaded.shape(), frame.shape());
        assert_eq!(missing_cells(&loaded), 80);
    }
}
