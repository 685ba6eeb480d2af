//! Dimension rows and the natural keys that identify them.
//!
//! Every dimension row carries an integer surrogate id assigned by the store
//! and a natural key taken from the transcript. Rows are created lazily on
//! first sighting and never deleted.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result};

// ─── NRP ─────────────────────────────────────────────────────────────────────

/// Student registration number.
///
/// Kept as the exact digit string printed on the transcript: leading zeros are
/// significant and comparisons are lexicographic over the fixed-width value,
/// never numeric.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Nrp(String);

impl Nrp {
  pub fn parse(raw: &str) -> Result<Self> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
      return Err(Error::InvalidNrp(raw.to_owned()));
    }
    Ok(Self(trimmed.to_owned()))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Nrp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl TryFrom<String> for Nrp {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { Self::parse(&value) }
}

impl From<Nrp> for String {
  fn from(value: Nrp) -> Self { value.0 }
}

// ─── Time ────────────────────────────────────────────────────────────────────

/// Half of an academic year. `Gasal` (odd) precedes `Genap` (even) within the
/// same year, which the derived ordering relies on.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Term {
  #[strum(to_string = "gasal", serialize = "ganjil", serialize = "gs")]
  Gasal,
  #[strum(to_string = "genap", serialize = "gn")]
  Genap,
}

impl Term {
  /// Parse any of the spellings used on transcripts (`Gasal`, `Ganjil`,
  /// `Gs`, `Genap`, `Gn`), case-insensitively.
  pub fn parse(raw: &str) -> Result<Self> {
    Self::from_str(raw.trim()).map_err(|_| Error::UnknownTerm(raw.to_owned()))
  }
}

/// Natural key of the time dimension: academic year (the year the academic
/// year starts in) and term.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TimePeriodKey {
  pub year: i32,
  pub term: Term,
}

impl TimePeriodKey {
  pub fn new(year: i32, term: Term) -> Self { Self { year, term } }
}

impl fmt::Display for TimePeriodKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.year, self.term)
  }
}

// ─── Stage ───────────────────────────────────────────────────────────────────

/// Stage of study: preparatory (tahap persiapan) or degree (tahap sarjana).
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Stage {
  #[strum(to_string = "preparatory", serialize = "persiapan")]
  Preparatory,
  #[strum(to_string = "degree", serialize = "sarjana")]
  Degree,
}

impl Stage {
  pub fn parse(raw: &str) -> Result<Self> {
    Self::from_str(raw.trim()).map_err(|_| Error::UnknownStage(raw.to_owned()))
  }
}

// ─── Rows ────────────────────────────────────────────────────────────────────

/// GPA and credit aggregate for one stage of study.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StageAggregate {
  pub gpa:     f64,
  pub credits: u32,
}

/// `Student` dimension row. Summary fields are derived and recomputed on every
/// ingestion of the student's transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
  pub student_id:     i64,
  pub nrp:            Nrp,
  pub name:           String,
  pub status:         Option<String>,
  pub cumulative_gpa: f64,
  /// All attempted credits (SKS tempuh).
  pub credits_taken:  u32,
  /// Credits with a passing grade (SKS lulus).
  pub credits_passed: u32,
  pub preparatory:    StageAggregate,
  pub degree:         StageAggregate,
}

/// `Course` dimension row, keyed by course code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
  pub course_id: i64,
  pub code:      String,
  pub name:      String,
  pub credits:   u32,
  /// Curriculum stage (tahap) the course belongs to, once a load has set it.
  pub stage:     Option<Stage>,
}

/// `Grade` dimension row. Static reference data, seeded from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
  pub grade_id: i64,
  pub letter:   String,
  pub weight:   f64,
}

/// `TimePeriod` dimension row, shared across students.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePeriod {
  pub time_id: i64,
  pub period:  TimePeriodKey,
}
