//! Error types for the transkrip-parse segmenter.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("{source_name}: no student identity (NRP) found")]
  MissingIdentity { source_name: String },

  #[error(transparent)]
  Core(#[from] transkrip_core::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
