//! The seam between document backends and the text pipeline.
//!
//! A backend turns a transcript document into ordered lines per page. The
//! segmenter only ever sees [`ExtractedDocument`], so tests can drive the whole
//! pipeline from in-memory pages.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transcript::SourceLocation;

/// Failure to obtain any text from a document. Aborts that file only.
#[derive(Debug, Error)]
pub enum ExtractionError {
  #[error("cannot open {path}: {reason}")]
  Open { path: PathBuf, reason: String },

  #[error("{0} is encrypted")]
  Encrypted(PathBuf),

  #[error("cannot read text of page {page} in {path}: {reason}")]
  Page {
    path:   PathBuf,
    page:   u32,
    reason: String,
  },

  #[error("{0} has no extractable text layer")]
  NoText(PathBuf),
}

/// Text of a single page in vertical reading order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
  /// 1-based page number.
  pub number: u32,
  pub lines:  Vec<String>,
}

/// All pages of a document, in page order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedDocument {
  pub pages: Vec<PageText>,
}

impl ExtractedDocument {
  /// Build a document from plain page contents, numbering pages from 1.
  pub fn from_pages<I, P, L>(pages: I) -> Self
  where
    I: IntoIterator<Item = P>,
    P: IntoIterator<Item = L>,
    L: Into<String>,
  {
    Self {
      pages: pages
        .into_iter()
        .zip(1..)
        .map(|(lines, number)| PageText {
          number,
          lines: lines.into_iter().map(Into::into).collect(),
        })
        .collect(),
    }
  }

  /// True when no page carries a single non-blank line.
  pub fn is_blank(&self) -> bool {
    self
      .pages
      .iter()
      .all(|p| p.lines.iter().all(|l| l.trim().is_empty()))
  }

  /// Every line across all pages, with its location.
  pub fn lines(&self) -> impl Iterator<Item = (SourceLocation, &str)> {
    self.pages.iter().flat_map(|page| {
      page.lines.iter().zip(1..).map(move |(text, line)| {
        (SourceLocation { page: page.number, line }, text.as_str())
      })
    })
  }
}

/// A document backend.
///
/// Implementations are synchronous and CPU-bound; the batch driver runs them
/// on blocking worker threads.
pub trait TextExtractor: Send + Sync {
  fn extract(&self, path: &Path) -> Result<ExtractedDocument, ExtractionError>;
}
