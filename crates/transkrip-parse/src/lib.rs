//! Transcript text to [`CandidateTranscript`].
//!
//! Segments extracted lines into header, semester blocks and footer, parses
//! every course row, and runs the metric calculator. Pure synchronous; no PDF
//! or database dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! use transkrip_core::{config::IngestConfig, extract::ExtractedDocument};
//! use transkrip_parse::parse_transcript;
//!
//! let doc = ExtractedDocument::from_pages([vec![
//!   "NRP / Nama 5025201001 / Budi Santoso",
//!   "EF234101 Kalkulus 4 2020/Gs/A A",
//! ]]);
//! let candidate =
//!   parse_transcript(&doc, "budi.pdf", &IngestConfig::default()).unwrap();
//! println!("{} attempts", candidate.attempts.len());
//! ```

mod anchor;
pub mod error;
pub mod row;
pub mod segment;

pub use error::{Error, Result};
pub use row::{ParsedRow, parse_row};
pub use segment::{Segmented, segment};
use transkrip_core::{
  config::IngestConfig,
  diagnostic::{Diagnostic, RowParseError},
  extract::ExtractedDocument,
  metrics,
  transcript::{CandidateTranscript, CourseAttempt},
};

/// Build the full per-file candidate from extracted text.
///
/// Only a missing student identity is an error. Rows that fail to parse are
/// skipped and recorded in `diagnostics` with their page and line.
pub fn parse_transcript(
  doc: &ExtractedDocument,
  source_name: &str,
  config: &IngestConfig,
) -> Result<CandidateTranscript> {
  let Segmented { student, blocks, orphans, printed, mut diagnostics } =
    segment(doc, source_name)?;

  let mut attempts = Vec::new();
  for block in blocks {
    for line in block.lines {
      match parse_row(&line.text, config) {
        Ok(row) => attempts.push(CourseAttempt {
          code:         row.code,
          name:         row.name,
          credits:      row.credits,
          grade:        row.grade,
          grade_weight: row.grade_weight,
          period:       row.period.unwrap_or(block.period),
          stage:        line.stage,
          location:     line.location,
        }),
        Err(error) => diagnostics.push(Diagnostic::RowParse {
          location: line.location,
          line: line.text,
          error,
        }),
      }
    }
  }

  // An orphan is rejected for its first structural problem, or failing that,
  // for having no period.
  for line in orphans {
    let error = parse_row(&line.text, config)
      .err()
      .unwrap_or(RowParseError::MissingPeriod);
    diagnostics.push(Diagnostic::RowParse {
      location: line.location,
      line: line.text,
      error,
    });
  }

  let calculation = metrics::calculate(attempts, &printed, config);
  diagnostics.extend(calculation.diagnostics);

  tracing::debug!(
    file = source_name,
    nrp = %student.nrp,
    attempts = calculation.attempts.len(),
    semesters = calculation.metrics.semesters.len(),
    diagnostics = diagnostics.len(),
    "parsed transcript"
  );

  Ok(CandidateTranscript {
    source: source_name.to_owned(),
    student,
    attempts: calculation.attempts,
    metrics: calculation.metrics,
    printed,
    diagnostics,
  })
}
