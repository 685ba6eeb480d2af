//! The per-file intermediate representation produced before anything touches
//! the store.
//!
//! A [`CandidateTranscript`] is private to the worker that built it, which is
//! what lets extraction through metric calculation run in parallel across
//! files.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::{
  diagnostic::Diagnostic,
  dimension::{Nrp, Stage, StageAggregate, TimePeriodKey},
};

// ─── Provenance ──────────────────────────────────────────────────────────────

/// Where a line came from: 1-based page number and 1-based line within it.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SourceLocation {
  pub page: u32,
  pub line: u32,
}

impl fmt::Display for SourceLocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "page {} line {}", self.page, self.line)
  }
}

// ─── Identity ────────────────────────────────────────────────────────────────

/// Identity fields from the transcript header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
  pub nrp:    Nrp,
  pub name:   String,
  /// Enrolment status as printed (e.g. "Aktif"), if any.
  pub status: Option<String>,
}

// ─── Printed totals ──────────────────────────────────────────────────────────

/// Running totals printed on the transcript itself. Only used to cross-check
/// the computed values; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrintedSummary {
  pub cumulative_gpa:      Option<f64>,
  pub credits_taken:       Option<u32>,
  pub credits_passed:      Option<u32>,
  pub preparatory_gpa:     Option<f64>,
  pub preparatory_credits: Option<u32>,
  pub degree_gpa:          Option<f64>,
  pub degree_credits:      Option<u32>,
  /// Printed IPS per semester block.
  pub semester_gpa:        BTreeMap<TimePeriodKey, f64>,
  /// Whether a footer section was located at all.
  pub footer_present:      bool,
}

// ─── Rows ────────────────────────────────────────────────────────────────────

/// A validated course row, placed in its time period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseAttempt {
  pub code:         String,
  pub name:         String,
  pub credits:      u32,
  pub grade:        String,
  pub grade_weight: f64,
  pub period:       TimePeriodKey,
  /// Stage section the row was printed under, when the transcript marks one.
  /// Always set once the candidate has been calculated.
  pub stage:        Option<Stage>,
  pub location:     SourceLocation,
}

impl CourseAttempt {
  pub fn weighted_contribution(&self) -> f64 {
    f64::from(self.credits) * self.grade_weight
  }
}

// ─── Metrics ─────────────────────────────────────────────────────────────────

/// Computed aggregates for one semester.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemesterMetrics {
  pub period:         TimePeriodKey,
  pub credits_taken:  u32,
  pub semester_gpa:   f64,
  pub cumulative_gpa: f64,
}

/// Computed aggregates for a whole transcript. These, not the printed values,
/// are what the loader persists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMetrics {
  /// Ordered by period.
  pub semesters:      Vec<SemesterMetrics>,
  pub cumulative_gpa: f64,
  pub credits_taken:  u32,
  pub credits_passed: u32,
  pub preparatory:    StageAggregate,
  pub degree:         StageAggregate,
}

// ─── Candidate ───────────────────────────────────────────────────────────────

/// Everything the loader needs for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateTranscript {
  /// Source file name, used in every diagnostic.
  pub source:      String,
  pub student:     StudentProfile,
  /// At most one attempt per (course code, period).
  pub attempts:    Vec<CourseAttempt>,
  pub metrics:     TranscriptMetrics,
  pub printed:     PrintedSummary,
  pub diagnostics: Vec<Diagnostic>,
}
