//! loglens CLI Module
//!
//! Command-line driver: load a CSV, analyze or rescore it, print a summary.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::AnalysisConfig;
use crate::export::DirectoryStore;
use crate::pipeline::{persist, restore, Analyzer};
use crate::report::{Report, Severity};
use crate::schema::{summarize_columns, ColumnStats, SchemaDetector};
use crate::utils::DataLoader;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

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

fn kv(key: &str, val: &str) {
    println!("  {:<18} {}", muted(key), val.white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "loglens")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Reconstruction-based anomaly detection for tabular logs")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train a model on a log file and report its anomalies
    Analyze {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Maximum window length
        #[arg(long)]
        max_window: Option<usize>,

        /// Number of training epochs
        #[arg(long)]
        epochs: Option<usize>,

        /// Write the JSON report here
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory to persist the trained model in
        #[arg(long, requires = "model_id")]
        model_dir: Option<PathBuf>,

        /// Identifier of the persisted model
        #[arg(long, requires = "model_dir")]
        model_id: Option<String>,
    },

    /// Score a log file with a previously persisted model
    Score {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Directory holding persisted models
        #[arg(long)]
        model_dir: PathBuf,

        /// Identifier of the persisted model
        #[arg(long)]
        model_id: String,

        /// Write the JSON report here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show inferred column types and statistics
    Profile {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
pub fn cmd_analyze(
    data_path: &Path,
    config_path: Option<&Path>,
    max_window: Option<usize>,
    epochs: Option<usize>,
    output: Option<&Path>,
    model_dir: Option<&Path>,
    model_id: Option<&str>,
) -> anyhow::Result<()> {
    section("Analyze");

    let mut config = match config_path {
        Some(path) => AnalysisConfig::from_json_file(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(w) = max_window {
        config = config.with_max_window(w);
    }
    if let Some(e) = epochs {
        config = config.with_epochs(e);
    }

    step_run("Loading data");
    let start = Instant::now();
    let records = DataLoader::new().load_csv(data_path)?;
    step_done(&format!("{} rows in {:?}", records.len(), start.elapsed()));

    step_run("Training and scoring");
    let (model, report) = Analyzer::new(config).fit(&records)?;
    step_done(&format!("{:.2}s", report.analysis_duration_secs));

    if let (Some(dir), Some(id)) = (model_dir, model_id) {
        let store = DirectoryStore::open(dir)?;
        persist(&store, &model, id)?;
        step_ok(&format!("Model saved as {} in {}", id.cyan(), dir.display()));
    }

    print_report(&report);
    write_report(&report, output)?;
    Ok(())
}

pub fn cmd_score(data_path: &Path, model_dir: &Path, model_id: &str, output: Option<&Path>) -> anyhow::Result<()> {
    section("Score");

    step_run(&format!("Restoring model {}", model_id.cyan()));
    let store = DirectoryStore::open(model_dir)?;
    let model = restore(&store, model_id)?;
    step_done(&format!("window {}", model.window_length()));

    step_run("Loading data");
    let records = DataLoader::new().load_csv(data_path)?;
    step_done(&format!("{} rows", records.len()));

    step_run("Scoring");
    let report = model.report(&records)?;
    step_done(&format!("{:.2}s", report.analysis_duration_secs));

    print_report(&report);
    write_report(&report, output)?;
    Ok(())
}

pub fn cmd_profile(data_path: &Path) -> anyhow::Result<()> {
    section("Profile");

    let records = DataLoader::new().load_csv(data_path)?;
    let schema = SchemaDetector::new().detect(&records)?;
    let profiles = summarize_columns(&records, &schema);

    for profile in &profiles {
        let detail = match &profile.stats {
            ColumnStats::Numeric { mean, std, min, max, .. } => format!(
                "mean {} · std {} · range [{}, {}]",
                fmt_opt(*mean),
                fmt_opt(*std),
                fmt_opt(*min),
                fmt_opt(*max)
            ),
            ColumnStats::Categorical { unique_count, top_values } => {
                let top: Vec<String> = top_values.iter().map(|v| format!("{} ({})", v.value, v.count)).collect();
                format!("{} unique · {}", unique_count, top.join(", "))
            }
            ColumnStats::Timestamp { earliest, latest, .. } => format!(
                "{} → {}",
                earliest.as_deref().unwrap_or("-"),
                latest.as_deref().unwrap_or("-")
            ),
        };
        println!(
            "  {:<20} {:<12} {}",
            profile.name.white(),
            muted(&format!("{:?}", profile.column_type)),
            dim(&detail)
        );
        if profile.missing > 0 {
            println!("  {:<20} {}", "", dim(&format!("{} missing", profile.missing)));
        }
    }
    println!();
    Ok(())
}

// ─── Output ────────────────────────────────────────────────────────────────────

fn print_report(report: &Report) {
    section("Summary");
    kv("Records", &report.total_records.to_string());
    kv("Sequences", &report.total_sequences.to_string());
    kv("Window", &report.window_length.to_string());
    kv("Threshold", &format!("{:.6}", report.threshold));
    kv("Anomalies", &report.anomalies_detected.to_string());
    if let Some(range) = &report.time_range {
        kv("Time range", &format!("{} → {}", range.start, range.end));
    }

    if !report.anomalies.is_empty() {
        section("Anomalies");
        for anomaly in report.anomalies.iter().take(20) {
            let tier = match anomaly.severity {
                Severity::High => anomaly.severity.as_str().red().bold(),
                Severity::Medium => anomaly.severity.as_str().yellow(),
            };
            println!(
                "  {:>6}  {:<8} score {:.3}  confidence {:.3}",
                format!("#{}", anomaly.index).white(),
                tier,
                anomaly.score,
                anomaly.confidence
            );
        }
        if report.anomalies.len() > 20 {
            println!("  {}", dim(&format!("… {} more", report.anomalies.len() - 20)));
        }
    }

    if !report.recommendations.is_empty() {
        section("Recommendations");
        for rec in &report.recommendations {
            println!("  {} {}", accent("•"), rec);
        }
    }
    println!();
}

fn write_report(report: &Report, output: Option<&Path>) -> anyhow::Result<()> {
    if let Some(path) = output {
        std::fs::write(path, report.to_json()?)?;
        step_ok(&format!("Report written to {}", path.display()));
    }
    Ok(())
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{:.3}", x)).unwrap_or_else(|| "-".to_string())
}
