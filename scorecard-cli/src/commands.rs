//! Subcommand handlers.

use crate::report::Report;
use crate::{Commands, ConfigAction, EvalArgs};
use anyhow::Context;
use scorecard_core::config::{ConfigOverrides, ScorecardConfig, load_config, workspace_config_path};
use scorecard_core::{EvalSession, TracingReporter};
use std::path::Path;
use std::sync::Arc;

pub async fn handle_command(command: Commands, workspace: &Path) -> anyhow::Result<()> {
    match command {
        Commands::Eval(args) => handle_eval(args, workspace).await,
        Commands::Config { action } => handle_config(action, workspace),
    }
}

async fn handle_eval(args: EvalArgs, workspace: &Path) -> anyhow::Result<()> {
    let report = run_eval(&args, workspace).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.render_table());
    }
    Ok(())
}

/// Load config with the flags from `args` on top and run one evaluation.
pub async fn run_eval(args: &EvalArgs, workspace: &Path) -> anyhow::Result<Report> {
    let config = load_config(Some(workspace), &overrides_from(args))
        .context("Failed to load config")?;
    tracing::debug!(
        backend = ?config.generation.backend,
        model = %config.generation.model,
        policy = %config.evaluation.on_unrecognized,
        "Configuration resolved"
    );

    let mut session = EvalSession::from_config(&config)
        .context("Failed to set up evaluation session")?
        .with_reporter(Arc::new(TracingReporter));
    let model = session.model_info();

    let metrics = session
        .evaluate(&args.dataset)
        .await
        .with_context(|| format!("Evaluation of '{}' failed", args.dataset))?;
    session.cleanup();

    Ok(Report::new(&args.dataset, model, metrics))
}

fn overrides_from(args: &EvalArgs) -> ConfigOverrides {
    ConfigOverrides {
        dataset_root: args.datasets.clone(),
        base_url: args.base_url.clone(),
        backend: args.backend,
        model: args.model.clone(),
        endpoint: args.endpoint.clone(),
        on_unrecognized: args.on_unrecognized,
    }
}

fn handle_config(action: ConfigAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = workspace_config_path(workspace);
            if config_path.exists() {
                println!("Configuration already exists at: {}", config_path.display());
                return Ok(());
            }
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let toml_str = toml::to_string_pretty(&ScorecardConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_config(Some(workspace), &ConfigOverrides::default())
                .context("Failed to load config")?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}
