//! Error types for `transkrip-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid NRP: {0:?}")]
  InvalidNrp(String),

  #[error("unknown term: {0:?}")]
  UnknownTerm(String),

  #[error("unknown stage: {0:?}")]
  UnknownStage(String),

  #[error("invalid ingestion config: {0}")]
  InvalidConfig(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
