//! Error type for `transkrip-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] transkrip_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// A transcript load was rolled back; nothing from it was persisted.
  #[error("load of {source_file} rolled back: {cause}")]
  Load {
    source_file: String,
    #[source]
    cause:       tokio_rusqlite::Error,
  },

  #[error("invalid stored value in {column}: {value:?}")]
  Decode { column: &'static str, value: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
