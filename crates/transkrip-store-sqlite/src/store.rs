//! [`SqliteStore`] — the SQLite implementation of [`WarehouseStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use transkrip_core::{
  diagnostic::ResolverConflict,
  dimension::{Course, Grade, Nrp, Student, TimePeriod},
  fact::{SemesterSummary, TranscriptEntry},
  grade::GradeTable,
  store::{LoadReport, WarehouseStore},
  transcript::CandidateTranscript,
};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{RawCourse, RawStudent, RawTimePeriod, STUDENT_COLUMNS},
  loader, resolver,
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A transcript warehouse backed by a single SQLite file.
///
/// Every statement runs on the one connection thread owned by
/// [`tokio_rusqlite`], which serialises natural-key resolution across all
/// concurrent callers. Cloning is cheap.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Number of ingestion-log rows written by one batch run.
  pub async fn log_count(&self, run_id: Uuid) -> Result<usize> {
    let run_id = crate::encode::encode_uuid(run_id);
    let count = self
      .conn
      .call(move |conn| {
        let count: usize = conn.query_row(
          "SELECT COUNT(*) FROM IngestionLog WHERE run_id = ?1",
          rusqlite::params![run_id],
          |r| r.get(0),
        )?;
        Ok(count)
      })
      .await?;
    Ok(count)
  }
}

// ─── WarehouseStore impl ─────────────────────────────────────────────────────

impl WarehouseStore for SqliteStore {
  type Error = Error;

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn seed_grades(&self, grades: &GradeTable) -> Result<Vec<ResolverConflict>> {
    let grades = grades.clone();

    let conflicts = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut conflicts = Vec::new();
        for grade in grades.iter() {
          conflicts.extend(resolver::seed_grade(&tx, grade)?);
        }
        tx.commit()?;
        Ok(conflicts)
      })
      .await?;

    for conflict in &conflicts {
      tracing::warn!(
        kind = %conflict.kind,
        key = %conflict.key,
        previous = %conflict.previous,
        current = %conflict.current,
        "grade weight changed"
      );
    }
    Ok(conflicts)
  }

  async fn load_transcript(
    &self,
    candidate: CandidateTranscript,
    run_id: Uuid,
  ) -> Result<LoadReport> {
    let source_file = candidate.source.clone();
    let now = Utc::now();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let report = loader::load(&tx, &candidate, run_id, now)
          .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
        tx.commit()?;
        Ok(report)
      })
      .await
      .map_err(|cause| Error::Load { source_file, cause })
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_student(&self, nrp: &Nrp) -> Result<Option<Student>> {
    let nrp = nrp.as_str().to_owned();

    let raw: Option<RawStudent> = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(
            &format!("SELECT {STUDENT_COLUMNS} FROM Student WHERE nrp = ?1"),
            rusqlite::params![nrp],
            RawStudent::from_row,
          )
          .optional()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawStudent::into_student).transpose()
  }

  async fn list_students(&self) -> Result<Vec<Student>> {
    let raws: Vec<RawStudent> = self
      .conn
      .call(|conn| {
        let mut stmt = conn
          .prepare(&format!("SELECT {STUDENT_COLUMNS} FROM Student ORDER BY nrp"))?;
        let rows = stmt
          .query_map([], RawStudent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawStudent::into_student).collect()
  }

  async fn list_courses(&self) -> Result<Vec<Course>> {
    let raws: Vec<RawCourse> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT course_id, code, name, credits, stage FROM Course ORDER BY code",
        )?;
        let rows = stmt
          .query_map([], RawCourse::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCourse::into_course).collect()
  }

  async fn list_grades(&self) -> Result<Vec<Grade>> {
    let grades = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT grade_id, letter, weight FROM Grade ORDER BY weight DESC",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(Grade {
              grade_id: row.get(0)?,
              letter:   row.get(1)?,
              weight:   row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(grades)
  }

  async fn list_time_periods(&self) -> Result<Vec<TimePeriod>> {
    let raws: Vec<RawTimePeriod> = self
      .conn
      .call(|conn| {
        // 'gasal' < 'genap' lexicographically, matching the academic order.
        let mut stmt = conn.prepare(
          "SELECT time_id, year, term FROM TimePeriod ORDER BY year, term",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawTimePeriod {
              time_id: row.get(0)?,
              year:    row.get(1)?,
              term:    row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTimePeriod::into_time_period).collect()
  }

  async fn entries_for(&self, student_id: i64) -> Result<Vec<TranscriptEntry>> {
    let entries = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT entry_id, student_id, course_id, grade_id, time_id,
                  credits, weighted_contribution
           FROM TranscriptEntry WHERE student_id = ?1
           ORDER BY entry_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![student_id], |row| {
            Ok(TranscriptEntry {
              entry_id:              row.get(0)?,
              student_id:            row.get(1)?,
              course_id:             row.get(2)?,
              grade_id:              row.get(3)?,
              time_id:               row.get(4)?,
              credits:               row.get(5)?,
              weighted_contribution: row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(entries)
  }

  async fn summaries_for(&self, student_id: i64) -> Result<Vec<SemesterSummary>> {
    let summaries = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT s.student_id, s.time_id, s.credits_taken,
                  s.semester_gpa, s.cumulative_gpa
           FROM SemesterSummary s JOIN TimePeriod t ON t.time_id = s.time_id
           WHERE s.student_id = ?1
           ORDER BY t.year, t.term",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![student_id], |row| {
            Ok(SemesterSummary {
              student_id:     row.get(0)?,
              time_id:        row.get(1)?,
              credits_taken:  row.get(2)?,
              semester_gpa:   row.get(3)?,
              cumulative_gpa: row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(summaries)
  }
}
