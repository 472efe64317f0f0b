//! Scorecard CLI: run benchmark evaluations against a text-generation model.

mod commands;
mod report;

use clap::Parser;
use scorecard_core::{BackendKind, UnrecognizedPolicy};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Scorecard: benchmark a text-generation model on JSONL datasets
#[derive(Parser, Debug)]
#[command(name = "scorecard", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (holds `.scorecard/config.toml`)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Evaluate a model on one dataset
    Eval(EvalArgs),
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Debug, Default)]
pub struct EvalArgs {
    /// Dataset identifier, e.g. `huggingface:truthful_qa.jsonl`
    pub dataset: String,

    /// Model to evaluate
    #[arg(short, long)]
    pub model: Option<String>,

    /// Directory holding dataset files
    #[arg(long)]
    pub datasets: Option<PathBuf>,

    /// Fetch datasets from `<URL>/<filename>` instead of the local directory
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Generation backend: ollama, mock
    #[arg(long)]
    pub backend: Option<BackendKind>,

    /// Backend endpoint
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Records in an unknown format: skip, score, fail
    #[arg(long, value_name = "POLICY")]
    pub on_unrecognized: Option<UnrecognizedPolicy>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a default configuration file into the workspace
    Init,
    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "scorecard", "scorecard")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "scorecard.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    commands::handle_command(cli.command, &workspace).await
}
