//! Fact rows of the star schema.
//!
//! Both fact tables reference dimensions through surrogate ids only. Their
//! rows for a student are replaced, never accumulated, when that student's
//! transcript is ingested again.

use serde::{Deserialize, Serialize};

/// `TranscriptEntry` — one row per (student, course, attempt).
///
/// A retake in a later term is a separate row distinguished by `time_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
  pub entry_id:              i64,
  pub student_id:            i64,
  pub course_id:             i64,
  pub grade_id:              i64,
  pub time_id:               i64,
  /// Credit weight at the time the course was taken.
  pub credits:               u32,
  /// `credits × grade weight`.
  pub weighted_contribution: f64,
}

impl TranscriptEntry {
  /// The grade weight recovered from the stored contribution.
  pub fn grade_weight(&self) -> f64 {
    if self.credits == 0 {
      0.0
    } else {
      self.weighted_contribution / f64::from(self.credits)
    }
  }
}

/// `SemesterSummary` — one row per (student, time period).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemesterSummary {
  pub student_id:     i64,
  pub time_id:        i64,
  pub credits_taken:  u32,
  pub semester_gpa:   f64,
  /// Running GPA over every attempt up to and including this period.
  pub cumulative_gpa: f64,
}
