use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use strata_config::AppConfig;
use strata_load::{BatchSummary, Loader};
use strata_store::SqliteReportStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "strata",
    about = "Loads query-execution reports into a relational store"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Parse report files or directories and persist them.
    Load(LoadArgs),
    /// Parse and validate report files without writing anywhere.
    Check(CheckArgs),
}

#[derive(Debug, Args)]
struct LoadArgs {
    #[arg(value_name = "PATH", required = true)]
    paths: Vec<PathBuf>,
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct CheckArgs {
    #[arg(value_name = "PATH", required = true)]
    paths: Vec<PathBuf>,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = load_cfg(cli.config.clone())?;

    match cli.command {
        CliCommand::Load(args) => {
            let db_path = args.db.unwrap_or_else(|| cfg.database.path.clone());
            let mut store = SqliteReportStore::open(&db_path).with_context(|| {
                format!("failed to open report database {}", db_path.display())
            })?;
            let summary = Loader::new(&mut store, &cfg.load).run(&args.paths);
            info!(
                "loaded {} report(s) into {}, {} failure(s)",
                summary.loaded,
                db_path.display(),
                summary.failures.len()
            );
            Ok(exit_code(&summary))
        }
        CliCommand::Check(args) => {
            let summary = Loader::parse_only(&cfg.load).run(&args.paths);
            info!(
                "validated {} report(s), {} failure(s)",
                summary.loaded,
                summary.failures.len()
            );
            Ok(exit_code(&summary))
        }
    }
}

fn load_cfg(raw_config: Option<PathBuf>) -> Result<AppConfig> {
    match strata_config::resolve_config_path(raw_config) {
        Some(path) => strata_config::load_config(&path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(AppConfig::default()),
    }
}

fn exit_code(summary: &BatchSummary) -> ExitCode {
    if summary.failures.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
