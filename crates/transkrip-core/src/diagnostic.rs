//! Non-fatal findings collected while ingesting a transcript.
//!
//! Fatal conditions (unreadable document, no student identity, rejected
//! write) are `Error` values in the crate that raises them. Everything here
//! lets the file continue and is reported as a structured log line.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use thiserror::Error;

use crate::{dimension::TimePeriodKey, transcript::SourceLocation};

// ─── Row parsing ─────────────────────────────────────────────────────────────

/// Why a single course line was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowParseError {
  #[error("expected at least {expected} tokens, found {found}")]
  TooFewTokens { expected: usize, found: usize },

  #[error("invalid course code {code:?}")]
  InvalidCourseCode { code: String },

  #[error("credit field {value:?} is not a number")]
  NonNumericCredit { value: String },

  #[error("credit weight {credits} outside {min}..={max}")]
  CreditOutOfRange { credits: u32, min: u32, max: u32 },

  #[error("unknown letter grade {grade:?}")]
  UnknownGrade { grade: String },

  #[error("row has no semester heading or period of its own")]
  MissingPeriod,
}

// ─── Validation ──────────────────────────────────────────────────────────────

/// Which printed GPA a mismatch refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "period", rename_all = "snake_case")]
pub enum GpaScope {
  Cumulative,
  Preparatory,
  Degree,
  Semester(TimePeriodKey),
}

impl std::fmt::Display for GpaScope {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Cumulative => f.write_str("cumulative GPA"),
      Self::Preparatory => f.write_str("preparatory-stage GPA"),
      Self::Degree => f.write_str("degree-stage GPA"),
      Self::Semester(period) => write!(f, "semester GPA for {period}"),
    }
  }
}

/// Which printed credit total a mismatch refers to.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
pub enum CreditScope {
  #[strum(to_string = "credits taken")]
  Taken,
  #[strum(to_string = "credits passed")]
  Passed,
  #[strum(to_string = "preparatory-stage credits")]
  Preparatory,
  #[strum(to_string = "degree-stage credits")]
  Degree,
}

/// A computed summary that disagrees with, or lacks, its printed counterpart.
/// The computed value is always the one persisted.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationWarning {
  #[error("no footer summary found; persisting computed totals")]
  FooterMissing,

  #[error("no semester blocks found")]
  NoSemesterBlocks,

  #[error("{scope}: printed {printed:.2}, computed {computed:.2}")]
  GpaMismatch { scope: GpaScope, printed: f64, computed: f64 },

  #[error("{scope}: printed {printed}, computed {computed}")]
  CreditMismatch { scope: CreditScope, printed: u32, computed: u32 },
}

// ─── Resolver conflicts ──────────────────────────────────────────────────────

/// The attribute that diverged when a natural key was seen again.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConflictKind {
  CourseName,
  CourseCredits,
  CourseStage,
  StudentName,
  GradeWeight,
  /// An existing (student, course, time) entry received a different grade.
  EntryGrade,
}

/// A natural key re-used with divergent attributes. The newer value has
/// already overwritten the stored one.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind} changed for {key}: {previous:?} -> {current:?}")]
pub struct ResolverConflict {
  pub kind:     ConflictKind,
  pub key:      String,
  pub previous: String,
  pub current:  String,
}

// ─── Diagnostic ──────────────────────────────────────────────────────────────

/// Any non-fatal finding attached to a transcript.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Diagnostic {
  #[error("row skipped at {location}: {error} ({line:?})")]
  RowParse {
    location: SourceLocation,
    line:     String,
    error:    RowParseError,
  },

  #[error("{0}")]
  Validation(ValidationWarning),

  #[error("duplicate row for {code} in {period} at {dropped}; keeping {kept}")]
  DuplicateAttempt {
    code:    String,
    period:  TimePeriodKey,
    dropped: SourceLocation,
    kept:    SourceLocation,
  },

  #[error("{0}")]
  Conflict(ResolverConflict),
}

impl Diagnostic {
  /// Short machine-readable tag for log fields.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::RowParse { .. } => "row_parse",
      Self::Validation(_) => "validation",
      Self::DuplicateAttempt { .. } => "duplicate_attempt",
      Self::Conflict(_) => "resolver_conflict",
    }
  }

  /// Page/line the finding points at, when it concerns a single line.
  pub fn location(&self) -> Option<SourceLocation> {
    match self {
      Self::RowParse { location, .. } => Some(*location),
      Self::DuplicateAttempt { dropped, .. } => Some(*dropped),
      Self::Validation(_) | Self::Conflict(_) => None,
    }
  }
}

impl From<ValidationWarning> for Diagnostic {
  fn from(value: ValidationWarning) -> Self { Self::Validation(value) }
}

impl From<ResolverConflict> for Diagnostic {
  fn from(value: ResolverConflict) -> Self { Self::Conflict(value) }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::dimension::Term;

  #[test]
  fn messages_name_the_scope() {
    let warning = ValidationWarning::GpaMismatch {
      scope:    GpaScope::Semester(TimePeriodKey::new(2020, Term::Genap)),
      printed:  3.5,
      computed: 3.25,
    };
    assert_eq!(
      warning.to_string(),
      "semester GPA for 2020/genap: printed 3.50, computed 3.25"
    );

    let credits = ValidationWarning::CreditMismatch {
      scope:    CreditScope::Passed,
      printed:  20,
      computed: 18,
    };
    assert_eq!(credits.to_string(), "credits passed: printed 20, computed 18");
  }

  #[test]
  fn row_parse_carries_location() {
    let location = SourceLocation { page: 2, line: 14 };
    let diagnostic = Diagnostic::RowParse {
      location,
      line: "EF234101 Kalkulus x A".into(),
      error: RowParseError::NonNumericCredit { value: "x".into() },
    };
    assert_eq!(diagnostic.kind(), "row_parse");
    assert_eq!(diagnostic.location(), Some(location));
  }

  #[test]
  fn conflict_display() {
    let conflict = ResolverConflict {
      kind:     ConflictKind::CourseName,
      key:      "EF234101".into(),
      previous: "Kalkulus I".into(),
      current:  "Kalkulus 1".into(),
    };
    assert_eq!(
      conflict.to_string(),
      "course_name changed for EF234101: \"Kalkulus I\" -> \"Kalkulus 1\""
    );
  }
}
