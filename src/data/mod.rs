//! Data ingestion and synthetic data generation

pub mod generator;
pub mod ingestion;

pub use generator::{generate_customer_data, write_csv, GeneratorConfig};
pub use ingestion::{load_path, source_for_path, validate, CsvSource, DataSource, MAX_MISSING_RATIO};
