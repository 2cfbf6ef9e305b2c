//! Churn CLI Module
//!
//! Command-line interface for data generation, training, batch prediction
//! and serving.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::data::{self, GeneratorConfig};
use crate::inference::ChurnPredictor;
use crate::pipeline::{self, PipelineOptions, FEATURE_IMPORTANCE_FILE};
use crate::preprocessing::{schema, PreprocessingConfig};
use crate::training::{ModelKind, TrainingConfig};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "churn")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Customer churn prediction: train, score and serve")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a synthetic customer dataset
    Generate {
        /// Number of customers
        #[arg(short, long, default_value = "1000")]
        rows: usize,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Output CSV file
        #[arg(short, long, default_value = "data/customer_data.csv")]
        output: PathBuf,
    },

    /// Train every candidate model and keep the best by F1
    Train {
        /// Training CSV; generated first when absent
        #[arg(short, long, default_value = "data/customer_data.csv")]
        data: PathBuf,

        /// Directory for the model, preprocessor and report
        #[arg(short, long, default_value = "models")]
        output_dir: PathBuf,

        /// Encode categoricals with the fixed churn vocabularies
        #[arg(long)]
        fixed_vocabulary: bool,

        /// Candidate models, comma separated
        #[arg(long, value_delimiter = ',', default_value = "logistic_regression,random_forest,gradient_boosting,svm")]
        models: Vec<ModelKind>,

        /// Fraction of rows held out for evaluation
        #[arg(long, default_value = "0.2")]
        test_size: f64,

        /// Seed for the split and the models
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Score a customer CSV with a trained model
    Predict {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,

        /// Trained model file
        #[arg(short, long, default_value = "models/best_model.json")]
        model: PathBuf,

        /// Fitted preprocessor file
        #[arg(short, long, default_value = "models/preprocessor.json")]
        preprocessor: PathBuf,

        /// Output predictions file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start the prediction service
    Serve {
        /// Server host
        #[arg(long, env = "CHURN_HOST", default_value = "0.0.0.0")]
        host: String,

        /// Server port
        #[arg(short, long, env = "CHURN_PORT", default_value = "8000")]
        port: u16,

        /// Trained model file
        #[arg(short, long, env = "CHURN_MODEL_PATH", default_value = "models/best_model.json")]
        model: PathBuf,

        /// Fitted preprocessor file
        #[arg(long, env = "CHURN_PREPROCESSOR_PATH", default_value = "models/preprocessor.json")]
        preprocessor: PathBuf,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_generate(rows: usize, seed: u64, output: &Path) -> anyhow::Result<()> {
    section("Generate");

    step_run(&format!("Generating {} customers", rows));
    let start = Instant::now();
    let config = GeneratorConfig::default().with_rows(rows).with_seed(seed);
    let mut frame = data::generate_customer_data(&config)?;
    step_done(&format!("{:?}", start.elapsed()));

    step_run(&format!("Saving → {}", output.display()));
    data::write_csv(&mut frame, output)?;
    step_done(&format!("{} rows × {} cols", frame.height(), frame.width()));

    let churned = frame
        .column(schema::TARGET_COLUMN)?
        .str()?
        .into_iter()
        .filter(|v| *v == Some("Yes"))
        .count();
    println!();
    println!("  {:<16} {}", muted("Churn rate"), format!("{:.1}%", 100.0 * churned as f64 / rows.max(1) as f64).white().bold());
    println!();
    Ok(())
}

pub fn cmd_train(
    data_path: &Path,
    output_dir: &Path,
    fixed_vocabulary: bool,
    models: Vec<ModelKind>,
    test_size: f64,
    seed: u64,
) -> anyhow::Result<()> {
    section("Train");

    let preprocessing = if fixed_vocabulary {
        PreprocessingConfig::default().with_fixed_vocabulary(schema::churn_vocabularies())
    } else {
        PreprocessingConfig::default()
    };
    let training = TrainingConfig::new()
        .with_models(models)
        .with_test_size(test_size)
        .with_random_state(seed);
    let options = PipelineOptions::new(data_path, output_dir)
        .with_preprocessing(preprocessing)
        .with_training(training);

    step_run(&format!("Training {} candidates", options.training.models.len()));
    let start = Instant::now();
    let outcome = pipeline::run_training(&options)?;
    step_done(&format!("{:?}", start.elapsed()));
    if outcome.generated_data {
        step_ok(&format!("Generated synthetic data at {}", data_path.display()));
    }

    let report = &outcome.report;
    println!();
    println!("  {} {}", muted("Rows"), format!("{} train · {} test", report.n_train, report.n_test).white());
    println!();
    println!(
        "  {:<24} {:>9} {:>9} {:>9} {:>9} {:>9}",
        muted("Model"), muted("Accuracy"), muted("Precision"), muted("Recall"), muted("F1"), muted("AUC"),
    );
    println!("  {}", dim(&"─".repeat(74)));
    for result in &report.results {
        let m = &result.metrics;
        let auc = m.roc_auc.map(|v| format!("{:.4}", v)).unwrap_or_else(|| "-".to_string());
        let is_best = report.best_model.as_deref() == Some(result.model_name.as_str());
        let name = if is_best {
            format!("{}", result.model_name.green().bold())
        } else {
            result.model_name.clone()
        };
        let pad = 24usize.saturating_sub(result.model_name.len());
        println!(
            "  {}{} {:>9.4} {:>9.4} {:>9.4} {:>9.4} {:>9}",
            name, " ".repeat(pad), m.accuracy, m.precision, m.recall, m.f1_score, auc,
        );
    }
    println!("  {}", dim(&"─".repeat(74)));

    if let Some(best) = &report.best_model {
        println!();
        println!("  {} {} {} {:.4}", ok("★"), best.white().bold(), muted("F1"), outcome.best_f1_score);
    }

    if !outcome.feature_importances.is_empty() {
        section("Top features");
        for (name, importance) in outcome.feature_importances.iter().take(5) {
            println!("  {:<24} {:>9.4}", name, importance);
        }
    }

    println!();
    step_ok(&format!("Model        → {}", outcome.model_path.display()));
    step_ok(&format!("Preprocessor → {}", outcome.preprocessor_path.display()));
    step_ok(&format!("Report       → {}", outcome.report_path.display()));
    if !outcome.feature_importances.is_empty() {
        step_ok(&format!("Importances  → {}", output_dir.join(FEATURE_IMPORTANCE_FILE).display()));
    }
    println!();
    Ok(())
}

pub fn cmd_predict(
    data_path: &Path,
    model_path: &Path,
    preprocessor_path: &Path,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    section("Predict");

    step_run("Loading model");
    let predictor = ChurnPredictor::load(model_path, preprocessor_path)?;
    step_done(predictor.model_name());

    step_run("Scoring");
    let start = Instant::now();
    let frame = pipeline::predict_file(&predictor, data_path, output)?;
    step_done(&format!("{} rows in {:?}", frame.height(), start.elapsed()));

    let predicted_churn = frame
        .column("churn_prediction")?
        .str()?
        .into_iter()
        .filter(|v| *v == Some("Yes"))
        .count();
    println!();
    println!("  {:<16} {}", muted("Rows"), frame.height().to_string().white());
    println!("  {:<16} {}", muted("Predicted churn"), predicted_churn.to_string().white().bold());
    match output {
        Some(path) => step_ok(&format!("Saved → {}", path.display())),
        None => println!("\n{}", frame.head(Some(10))),
    }
    println!();
    Ok(())
}

pub async fn cmd_serve(
    host: &str,
    port: u16,
    model_path: &Path,
    preprocessor_path: &Path,
) -> anyhow::Result<()> {
    use crate::server::{run_server, ServerConfig};

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "Churn Prediction API".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("API    ", &format!("http://{}:{}", host, port)));
    line_box(&kv("Health ", &format!("http://{}:{}/health", host, port)));
    line_box(&kv("Model  ", &model_path.display().to_string()));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box_center(&format!("{}", dim("ctrl+c to stop")));
    line_box_empty();
    line_box_bottom();
    println!();

    let config = ServerConfig::default()
        .with_host(host)
        .with_port(port)
        .with_model_path(model_path)
        .with_preprocessor_path(preprocessor_path);

    run_server(config).await
}
