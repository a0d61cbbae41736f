//! loglens - Main Entry Point
//!
//! Reconstruction-based anomaly detection for tabular logs.

use clap::Parser;
use loglens::cli::{cmd_analyze, cmd_profile, cmd_score, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loglens=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze { data, config, max_window, epochs, output, model_dir, model_id } => {
            cmd_analyze(
                &data,
                config.as_deref(),
                max_window,
                epochs,
                output.as_deref(),
                model_dir.as_deref(),
                model_id.as_deref(),
            )?;
        }
        Commands::Score { data, model_dir, model_id, output } => {
            cmd_score(&data, &model_dir, &model_id, output.as_deref())?;
        }
        Commands::Profile { data } => {
            cmd_profile(&data)?;
        }
    }

    Ok(())
}
