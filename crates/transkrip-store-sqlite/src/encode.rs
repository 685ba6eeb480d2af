//! Encoding and decoding helpers between domain types and SQLite columns.
//!
//! Timestamps are RFC 3339 strings, run ids hyphenated lowercase UUIDs, and
//! the ingestion log's warnings a compact JSON array. Terms and stages are
//! stored under their canonical lowercase names.

use std::str::FromStr as _;

use chrono::{DateTime, Utc};
use transkrip_core::{
  diagnostic::Diagnostic,
  dimension::{
    Course, Nrp, Stage, StageAggregate, Student, Term, TimePeriod, TimePeriodKey,
  },
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn encode_term(term: &Term) -> &str { term.as_ref() }

pub fn decode_term(s: &str) -> Result<Term> {
  Term::from_str(s).map_err(|_| Error::Decode {
    column: "TimePeriod.term",
    value:  s.to_owned(),
  })
}

pub fn encode_stage(stage: &Stage) -> &str { stage.as_ref() }

pub fn decode_stage(s: &str) -> Result<Stage> {
  Stage::from_str(s).map_err(|_| Error::Decode {
    column: "Course.stage",
    value:  s.to_owned(),
  })
}

pub fn encode_warnings(diagnostics: &[Diagnostic]) -> serde_json::Result<String> {
  serde_json::to_string(diagnostics)
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const STUDENT_COLUMNS: &str = "student_id, nrp, name, status, \
  cumulative_gpa, credits_taken, credits_passed, preparatory_gpa, \
  preparatory_credits, degree_gpa, degree_credits";

/// Columns of a `Student` row as read, before the NRP is re-validated.
pub struct RawStudent {
  pub student_id:          i64,
  pub nrp:                 String,
  pub name:                String,
  pub status:              Option<String>,
  pub cumulative_gpa:      f64,
  pub credits_taken:       u32,
  pub credits_passed:      u32,
  pub preparatory_gpa:     f64,
  pub preparatory_credits: u32,
  pub degree_gpa:          f64,
  pub degree_credits:      u32,
}

impl RawStudent {
  /// Read a row selected with [`STUDENT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      student_id:          row.get(0)?,
      nrp:                 row.get(1)?,
      name:                row.get(2)?,
      status:              row.get(3)?,
      cumulative_gpa:      row.get(4)?,
      credits_taken:       row.get(5)?,
      credits_passed:      row.get(6)?,
      preparatory_gpa:     row.get(7)?,
      preparatory_credits: row.get(8)?,
      degree_gpa:          row.get(9)?,
      degree_credits:      row.get(10)?,
    })
  }

  pub fn into_student(self) -> Result<Student> {
    Ok(Student {
      student_id:     self.student_id,
      nrp:            Nrp::parse(&self.nrp)?,
      name:           self.name,
      status:         self.status,
      cumulative_gpa: self.cumulative_gpa,
      credits_taken:  self.credits_taken,
      credits_passed: self.credits_passed,
      preparatory:    StageAggregate {
        gpa:     self.preparatory_gpa,
        credits: self.preparatory_credits,
      },
      degree:         StageAggregate {
        gpa:     self.degree_gpa,
        credits: self.degree_credits,
      },
    })
  }
}

/// Columns of a `Course` row with the stage still as text.
pub struct RawCourse {
  pub course_id: i64,
  pub code:      String,
  pub name:      String,
  pub credits:   u32,
  pub stage:     Option<String>,
}

impl RawCourse {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      course_id: row.get(0)?,
      code:      row.get(1)?,
      name:      row.get(2)?,
      credits:   row.get(3)?,
      stage:     row.get(4)?,
    })
  }

  pub fn into_course(self) -> Result<Course> {
    Ok(Course {
      course_id: self.course_id,
      code:      self.code,
      name:      self.name,
      credits:   self.credits,
      stage:     self.stage.as_deref().map(decode_stage).transpose()?,
    })
  }
}

/// Columns of a `TimePeriod` row with the term still as text.
pub struct RawTimePeriod {
  pub time_id: i64,
  pub year:    i32,
  pub term:    String,
}

impl RawTimePeriod {
  pub fn into_time_period(self) -> Result<TimePeriod> {
    Ok(TimePeriod {
      time_id: self.time_id,
      period:  TimePeriodKey::new(self.year, decode_term(&self.term)?),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn terms_are_stored_by_canonical_name() {
    assert_eq!(encode_term(&Term::Gasal), "gasal");
    assert_eq!(encode_term(&Term::Genap), "genap");
    // Aliases accepted on input never reach the column, but decode anyway.
    assert_eq!(decode_term("ganjil").unwrap(), Term::Gasal);
    assert!(matches!(
      decode_term("pendek"),
      Err(Error::Decode { column: "TimePeriod.term", .. })
    ));
  }

  #[test]
  fn stages_are_stored_by_canonical_name() {
    assert_eq!(encode_stage(&Stage::Preparatory), "preparatory");
    assert_eq!(encode_stage(&Stage::Degree), "degree");
    assert_eq!(decode_stage("degree").unwrap(), Stage::Degree);
    assert!(decode_stage("profesi").is_err());
  }
}
