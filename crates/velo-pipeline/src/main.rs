//! `velo`: consolidate and aggregate one day of bicycle-share snapshots.
//!
//! Reads `velo.toml` (or the path given with `--config`), layered under
//! `VELO_`-prefixed environment variables, then runs the pipeline against the
//! SQLite store for the requested day.
//!
//! ```text
//! velo --date 2024-05-01
//! velo --config /etc/velo.toml consolidate
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use velo_core::snapshot::StagingTable;
use velo_pipeline::{DirectoryProvider, Pipeline, PipelineConfig, SourceFailure};
use velo_store_sqlite::SqliteStore;

#[derive(Parser)]
#[command(author, version, about = "Bicycle-share consolidation and aggregation pipeline")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "velo.toml")]
  config: PathBuf,

  /// Ingestion day to process (default: today).
  #[arg(long, value_name = "YYYY-MM-DD")]
  date: Option<NaiveDate>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy, Default)]
enum Command {
  /// Consolidate, then aggregate.
  #[default]
  Run,
  /// Stage the day's raw snapshots only.
  Consolidate,
  /// Rebuild the star schema from the latest staged snapshots only.
  Aggregate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("VELO"))
    .build()
    .context("failed to read config file")?;

  let cfg: PipelineConfig = settings
    .try_deserialize()
    .context("failed to deserialise PipelineConfig")?;

  let store_path = expand_tilde(&cfg.store_path);
  let raw_data_dir = expand_tilde(&cfg.raw_data_dir);

  if let Some(parent) = store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let run_date = cli.date.unwrap_or_else(|| Local::now().date_naive());
  let pipeline = Pipeline::new(store, DirectoryProvider::new(raw_data_dir), run_date)
    .with_unknown_status(cfg.unknown_status);

  let failures: Vec<String> = match cli.command.unwrap_or_default() {
    Command::Run => {
      let report = pipeline.run().await.context("pipeline run failed")?;
      report.failures().map(|(table, f)| describe(table, f)).collect()
    }
    Command::Consolidate => {
      let reports = pipeline.consolidate().await.context("consolidation failed")?;
      reports
        .iter()
        .flat_map(|r| r.failed.iter().map(|f| describe(r.table, f)))
        .collect()
    }
    Command::Aggregate => {
      pipeline.aggregate().await.context("aggregation failed")?;
      Vec::new()
    }
  };

  if !failures.is_empty() {
    anyhow::bail!("{} source(s) failed: {}", failures.len(), failures.join("; "));
  }
  Ok(())
}

fn describe(table: StagingTable, failure: &SourceFailure) -> String {
  format!("{table}/{}: {}", failure.origin, failure.error)
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
