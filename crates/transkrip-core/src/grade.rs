//! The grade-to-weight reference table.
//!
//! Weights are institution-specific, so the table is supplied by configuration
//! and seeded into the `Grade` dimension rather than derived from transcripts.

use serde::{Deserialize, Serialize};

/// One letter grade and its numeric weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeDef {
  pub letter: String,
  pub weight: f64,
}

/// Ordered set of letter grades. Lookups are exact and case-sensitive; the
/// transcript prints letters in upper case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GradeTable(Vec<GradeDef>);

impl GradeTable {
  pub fn new(grades: Vec<GradeDef>) -> Self { Self(grades) }

  /// The institution's published reference table.
  pub fn reference() -> Self {
    Self(
      [
        ("A", 4.0),
        ("AB", 3.5),
        ("B", 3.0),
        ("BC", 2.5),
        ("C", 2.0),
        ("D", 1.0),
        ("E", 0.0),
      ]
      .into_iter()
      .map(|(letter, weight)| GradeDef { letter: letter.to_owned(), weight })
      .collect(),
    )
  }

  pub fn weight(&self, letter: &str) -> Option<f64> {
    self.0.iter().find(|g| g.letter == letter).map(|g| g.weight)
  }

  pub fn contains(&self, letter: &str) -> bool { self.weight(letter).is_some() }

  pub fn iter(&self) -> impl Iterator<Item = &GradeDef> { self.0.iter() }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl Default for GradeTable {
  fn default() -> Self { Self::reference() }
}
