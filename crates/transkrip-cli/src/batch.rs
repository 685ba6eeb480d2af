//! The batch driver.
//!
//! Extraction and parsing run on blocking worker threads, at most `workers`
//! files at a time. Finished candidates flow over a channel to one loader
//! loop, so every store write for the batch is issued from a single task.

use std::{
  io,
  path::{Path, PathBuf},
  sync::Arc,
};

use thiserror::Error;
use tokio::{
  sync::{Semaphore, mpsc},
  task::{JoinError, JoinSet},
};
use transkrip_core::{
  config::IngestConfig,
  extract::{ExtractionError, TextExtractor},
  store::{LoadReport, WarehouseStore},
  transcript::CandidateTranscript,
};
use uuid::Uuid;

use crate::report;

// ─── Discovery ───────────────────────────────────────────────────────────────

/// Every regular file in `dir` with a `.pdf` extension (any case), sorted.
pub fn discover(dir: &Path) -> io::Result<Vec<PathBuf>> {
  let mut files = Vec::new();
  for entry in std::fs::read_dir(dir)? {
    let entry = entry?;
    if !entry.file_type()?.is_file() {
      continue;
    }
    let path = entry.path();
    if path
      .extension()
      .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
    {
      files.push(path);
    }
  }
  files.sort();
  Ok(files)
}

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// Why a file was not loaded. Never stops the batch.
#[derive(Debug, Error)]
pub enum FileError {
  #[error("extraction failed: {0}")]
  Extraction(#[from] ExtractionError),

  #[error("segmentation failed: {0}")]
  Segmentation(#[from] transkrip_parse::Error),

  #[error("load failed: {0}")]
  Load(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("worker task failed: {0}")]
  Worker(#[from] JoinError),
}

#[derive(Debug)]
pub struct FileOutcome {
  pub file:        PathBuf,
  /// Non-fatal findings raised while parsing this file.
  pub diagnostics: usize,
  pub result:      Result<LoadReport, FileError>,
}

#[derive(Debug)]
pub struct BatchSummary {
  pub run_id:   Uuid,
  /// One outcome per input file, in file order.
  pub outcomes: Vec<FileOutcome>,
}

impl BatchSummary {
  pub fn loaded(&self) -> usize {
    self.outcomes.iter().filter(|o| o.result.is_ok()).count()
  }

  pub fn failed(&self) -> usize { self.outcomes.len() - self.loaded() }

  pub fn all_loaded(&self) -> bool { self.failed() == 0 }
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

/// Display name used as the `source_file` of a transcript.
pub fn source_name(path: &Path) -> String {
  path
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_else(|| path.display().to_string())
}

/// Extract and parse one file. Runs on a blocking thread.
pub fn prepare<X: TextExtractor + ?Sized>(
  extractor: &X,
  path: &Path,
  config: &IngestConfig,
) -> Result<CandidateTranscript, FileError> {
  let doc = extractor.extract(path)?;
  let candidate =
    transkrip_parse::parse_transcript(&doc, &source_name(path), config)?;
  Ok(candidate)
}

/// Run every file through the pipeline and load the candidates into `store`.
pub async fn run_batch<S, X>(
  store: Arc<S>,
  extractor: Arc<X>,
  files: Vec<PathBuf>,
  config: Arc<IngestConfig>,
  workers: usize,
) -> BatchSummary
where
  S: WarehouseStore + 'static,
  X: TextExtractor + 'static,
{
  let run_id = Uuid::new_v4();
  let workers = workers.max(1);
  tracing::info!(%run_id, files = files.len(), workers, "starting batch");

  let (tx, mut rx) =
    mpsc::channel::<(PathBuf, Result<CandidateTranscript, FileError>)>(workers);
  let semaphore = Arc::new(Semaphore::new(workers));

  let producer = tokio::spawn(async move {
    let mut tasks = JoinSet::new();
    for file in files {
      let Ok(permit) = semaphore.clone().acquire_owned().await else {
        break;
      };
      let extractor = extractor.clone();
      let config = config.clone();
      let tx = tx.clone();

      tasks.spawn(async move {
        let path = file.clone();
        let prepared = tokio::task::spawn_blocking(move || {
          prepare(extractor.as_ref(), &path, &config)
        })
        .await
        .map_err(FileError::from)
        .and_then(|result| result);

        // The permit is held until the loader has room for the result.
        if tx.send((file, prepared)).await.is_err() {
          tracing::error!("loader stopped before all files were prepared");
        }
        drop(permit);
      });
    }
    while tasks.join_next().await.is_some() {}
  });

  let mut outcomes = Vec::new();
  while let Some((file, prepared)) = rx.recv().await {
    let source = source_name(&file);
    let mut diagnostics = 0;

    let result = match prepared {
      Ok(candidate) => {
        diagnostics = candidate.diagnostics.len();
        report::log_diagnostics(&source, &candidate.diagnostics);
        match store.load_transcript(candidate, run_id).await {
          Ok(load) => {
            report::log_conflicts(&source, &load.conflicts);
            Ok(load)
          }
          Err(e) => Err(FileError::Load(Box::new(e))),
        }
      }
      Err(e) => Err(e),
    };

    match &result {
      Ok(load) => tracing::info!(
        file = %source,
        entries = load.entries_written,
        removed = load.entries_removed,
        diagnostics,
        "loaded transcript"
      ),
      Err(error) => tracing::error!(file = %source, %error, "file failed"),
    }
    outcomes.push(FileOutcome { file, diagnostics, result });
  }

  if let Err(e) = producer.await {
    tracing::error!(error = %e, "batch producer task failed");
  }

  outcomes.sort_by(|a, b| a.file.cmp(&b.file));
  BatchSummary { run_id, outcomes }
}
