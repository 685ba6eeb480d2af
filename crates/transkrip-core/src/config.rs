//! Ingestion rules that are institution-specific and therefore configured
//! rather than hard-coded.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, grade::GradeTable};

/// Business rules applied while parsing rows and computing metrics.
///
/// Every field has a default so a partial `[ingest]` table in the config file
/// only overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
  /// Letter grades accepted on course rows, with their weights.
  pub grades:                GradeTable,
  /// Letters that do not count towards passed credits.
  pub failing_grades:        Vec<String>,
  /// When a transcript does not mark its stage sections, semesters with a
  /// 1-based index up to this value count as the preparatory stage.
  pub preparatory_semesters: u32,
  /// Largest absolute difference between a printed and a computed GPA that is
  /// not reported.
  pub gpa_tolerance:         f64,
  /// Inclusive plausible range for a course's credit weight.
  pub min_credits:           u32,
  pub max_credits:           u32,
}

impl Default for IngestConfig {
  fn default() -> Self {
    Self {
      grades:                GradeTable::reference(),
      failing_grades:        vec!["D".to_owned(), "E".to_owned()],
      preparatory_semesters: 2,
      gpa_tolerance:         0.01,
      min_credits:           1,
      max_credits:           6,
    }
  }
}

impl IngestConfig {
  pub fn is_failing(&self, letter: &str) -> bool {
    self.failing_grades.iter().any(|g| g == letter)
  }

  /// Reject tables that would make the pipeline ambiguous.
  pub fn validate(&self) -> Result<()> {
    if self.grades.is_empty() {
      return Err(Error::InvalidConfig("grade table is empty".into()));
    }

    let mut seen = HashSet::new();
    for grade in self.grades.iter() {
      if !seen.insert(grade.letter.as_str()) {
        return Err(Error::InvalidConfig(format!(
          "grade {:?} listed twice",
          grade.letter
        )));
      }
      if !grade.weight.is_finite() || grade.weight < 0.0 {
        return Err(Error::InvalidConfig(format!(
          "grade {:?} has invalid weight {}",
          grade.letter, grade.weight
        )));
      }
    }

    if let Some(unknown) =
      self.failing_grades.iter().find(|g| !self.grades.contains(g))
    {
      return Err(Error::InvalidConfig(format!(
        "failing grade {unknown:?} is not in the grade table"
      )));
    }

    if self.min_credits > self.max_credits {
      return Err(Error::InvalidConfig(format!(
        "min_credits {} exceeds max_credits {}",
        self.min_credits, self.max_credits
      )));
    }

    if self.gpa_tolerance.is_nan() || self.gpa_tolerance < 0.0 {
      return Err(Error::InvalidConfig("gpa_tolerance must be >= 0".into()));
    }

    Ok(())
  }
}
