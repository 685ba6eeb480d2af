//! `transkrip` — batch-load transcript PDFs into the academic warehouse.
//!
//! # Usage
//!
//! ```
//! transkrip --input ./transcripts --store ~/data/transkrip.db
//! transkrip --config transkrip.toml --workers 8
//! ```
//!
//! Exits with status 1 when any file failed to load.

mod batch;
mod report;
mod settings;

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use transkrip_core::store::WarehouseStore;
use transkrip_pdf::LopdfExtractor;
use transkrip_store_sqlite::SqliteStore;

use crate::settings::expand_tilde;

#[derive(Parser)]
#[command(author, version, about = "Load academic transcripts into a SQLite star schema")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "transkrip.toml")]
  config: PathBuf,

  /// Directory of transcript PDFs.
  #[arg(short, long, value_name = "DIR")]
  input: Option<PathBuf>,

  /// SQLite database file.
  #[arg(short, long, value_name = "PATH")]
  store: Option<PathBuf>,

  /// Files extracted and parsed concurrently.
  #[arg(short, long)]
  workers: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let mut settings = settings::load(&cli.config)?;
  if let Some(input) = cli.input {
    settings.input_dir = expand_tilde(&input);
  }
  if let Some(store) = cli.store {
    settings.store_path = expand_tilde(&store);
  }
  if let Some(workers) = cli.workers {
    settings.workers = workers;
  }
  settings.validate()?;

  if !settings.input_dir.is_dir() {
    std::fs::create_dir_all(&settings.input_dir).with_context(|| {
      format!("failed to create input directory {}", settings.input_dir.display())
    })?;
    tracing::warn!(
      dir = %settings.input_dir.display(),
      "input directory was missing and has been created; add transcripts and rerun"
    );
    return Ok(ExitCode::SUCCESS);
  }

  if let Some(parent) = settings.store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent).with_context(|| {
      format!("failed to create store directory {}", parent.display())
    })?;
  }

  let store = SqliteStore::open(&settings.store_path)
    .await
    .with_context(|| format!("failed to open store at {}", settings.store_path.display()))?;
  store
    .seed_grades(&settings.ingest.grades)
    .await
    .context("failed to seed the Grade dimension")?;

  let files = batch::discover(&settings.input_dir).with_context(|| {
    format!("failed to list {}", settings.input_dir.display())
  })?;
  if files.is_empty() {
    tracing::info!(dir = %settings.input_dir.display(), "no PDF files to ingest");
    return Ok(ExitCode::SUCCESS);
  }

  let summary = batch::run_batch(
    Arc::new(store),
    Arc::new(LopdfExtractor::new()),
    files,
    Arc::new(settings.ingest),
    settings.workers,
  )
  .await;
  report::print_summary(&summary);

  Ok(if summary.all_loaded() {
    ExitCode::SUCCESS
  } else {
    ExitCode::FAILURE
  })
}
