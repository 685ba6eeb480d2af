//! `lopdf` text-layer backend for transkrip.
//!
//! Implements [`TextExtractor`] over born-digital transcripts. Scanned
//! documents without a text layer are rejected with
//! [`ExtractionError::NoText`]; OCR is out of scope.

pub mod normalize;

use std::path::Path;

use lopdf::Document;
use transkrip_core::extract::{
  ExtractedDocument, ExtractionError, PageText, TextExtractor,
};

/// Extracts page text with `lopdf` and normalises each line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfExtractor;

impl LopdfExtractor {
  pub fn new() -> Self { Self }
}

impl TextExtractor for LopdfExtractor {
  fn extract(&self, path: &Path) -> Result<ExtractedDocument, ExtractionError> {
    let mut doc = Document::load(path).map_err(|e| ExtractionError::Open {
      path:   path.to_path_buf(),
      reason: e.to_string(),
    })?;

    // Exports locked only with an owner password open with the empty user
    // password.
    if doc.is_encrypted() {
      doc.decrypt("").map_err(|e| {
        tracing::debug!(file = %path.display(), error = %e, "empty password rejected");
        ExtractionError::Encrypted(path.to_path_buf())
      })?;
    }

    let mut pages = Vec::new();
    let mut first_failure = None;
    for page_number in doc.get_pages().into_keys() {
      match doc.extract_text(&[page_number]) {
        Ok(text) => pages.push(PageText {
          number: page_number,
          lines:  normalize::normalize_page(&text),
        }),
        Err(e) => {
          tracing::warn!(
            file = %path.display(),
            page = page_number,
            error = %e,
            "skipping page without readable text"
          );
          first_failure.get_or_insert(ExtractionError::Page {
            path:   path.to_path_buf(),
            page:   page_number,
            reason: e.to_string(),
          });
        }
      }
    }

    let document = ExtractedDocument { pages };
    if document.is_blank() {
      return Err(
        first_failure.unwrap_or_else(|| ExtractionError::NoText(path.to_path_buf())),
      );
    }

    tracing::debug!(
      file = %path.display(),
      pages = document.pages.len(),
      "extracted text layer"
    );
    Ok(document)
  }
}
