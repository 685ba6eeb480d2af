//! Layered settings: optional TOML file, then `TRANSKRIP_*` environment
//! variables, then command-line flags.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use serde::Deserialize;
use transkrip_core::config::IngestConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// Directory scanned for `.pdf` transcripts.
  pub input_dir:  PathBuf,
  /// SQLite file holding the star schema.
  pub store_path: PathBuf,
  /// Files extracted and parsed concurrently.
  pub workers:    usize,
  pub ingest:     IngestConfig,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      input_dir:  PathBuf::from("transkrip"),
      store_path: PathBuf::from("transkrip.db"),
      workers:    4,
      ingest:     IngestConfig::default(),
    }
  }
}

impl Settings {
  pub fn validate(&self) -> anyhow::Result<()> {
    if self.workers == 0 {
      bail!("workers must be at least 1");
    }
    self.ingest.validate().context("invalid [ingest] rules")?;
    Ok(())
  }
}

/// Read `path` (if it exists) and the environment into [`Settings`].
///
/// Nested keys use a double underscore, e.g. `TRANSKRIP_INGEST__GPA_TOLERANCE`.
pub fn load(path: &Path) -> anyhow::Result<Settings> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix("TRANSKRIP")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .with_context(|| format!("failed to read config from {}", path.display()))?;

  let mut settings: Settings =
    settings.try_deserialize().context("failed to deserialise Settings")?;
  settings.input_dir = expand_tilde(&settings.input_dir);
  settings.store_path = expand_tilde(&settings.store_path);
  Ok(settings)
}

/// Expand a leading `~` to the value of `$HOME`.
pub fn expand_tilde(path: &Path) -> PathBuf {
  if let Ok(rest) = path.strip_prefix("~")
    && let Some(home) = std::env::var_os("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
