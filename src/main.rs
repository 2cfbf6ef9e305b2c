//! Churn - Main Entry Point
//!
//! Customer churn prediction: data generation, training, batch scoring and
//! the HTTP prediction service.

use clap::Parser;
use churn_pipeline::cli::{cmd_generate, cmd_predict, cmd_serve, cmd_train, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "churn_pipeline=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate { rows, seed, output } => {
            cmd_generate(rows, seed, &output)?;
        }
        Commands::Train { data, output_dir, fixed_vocabulary, models, test_size, seed } => {
            cmd_train(&data, &output_dir, fixed_vocabulary, models, test_size, seed)?;
        }
        Commands::Predict { data, model, preprocessor, output } => {
            cmd_predict(&data, &model, &preprocessor, output.as_deref())?;
        }
        Commands::Serve { host, port, model, preprocessor } => {
            cmd_serve(&host, port, &model, &preprocessor).await?;
        }
    }

    Ok(())
}
