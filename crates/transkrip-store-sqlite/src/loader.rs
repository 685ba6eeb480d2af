//! Star-schema loader: one candidate transcript, one transaction.
//!
//! The caller owns the transaction; [`load`] only issues statements on it. Any
//! error leaves the caller to drop the transaction, which rolls back every
//! write made here.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, Transaction, params};
use thiserror::Error;
use transkrip_core::{
  diagnostic::{ConflictKind, Diagnostic, ResolverConflict},
  dimension::{Stage, TimePeriodKey},
  store::LoadReport,
  transcript::CandidateTranscript,
};
use uuid::Uuid;

use crate::{
  encode::{encode_dt, encode_uuid, encode_warnings},
  resolver,
};

/// Why a load was rejected. Carried out of the connection thread inside
/// `tokio_rusqlite::Error::Other`.
#[derive(Debug, Error)]
pub enum LoadError {
  #[error(transparent)]
  Sql(#[from] rusqlite::Error),

  #[error("grade {0:?} is not in the Grade dimension")]
  UnknownGrade(String),

  #[error("cannot encode warnings: {0}")]
  Json(#[from] serde_json::Error),
}

pub fn load(
  tx: &Transaction<'_>,
  candidate: &CandidateTranscript,
  run_id: Uuid,
  now: DateTime<Utc>,
) -> Result<LoadReport, LoadError> {
  let nrp = candidate.student.nrp.as_str();
  let mut conflicts = Vec::new();

  let (student_id, renamed) =
    resolver::upsert_student(tx, &candidate.student, &candidate.metrics)?;
  conflicts.extend(renamed);

  let mut times: HashMap<TimePeriodKey, i64> = HashMap::new();
  let mut kept: HashSet<i64> = HashSet::new();

  // A course takes the stage of its earliest attempt in this transcript.
  let mut course_stages: HashMap<&str, (TimePeriodKey, Option<Stage>)> =
    HashMap::new();
  for attempt in &candidate.attempts {
    let first = course_stages
      .entry(attempt.code.as_str())
      .or_insert((attempt.period, attempt.stage));
    if attempt.period < first.0 {
      *first = (attempt.period, attempt.stage);
    }
  }

  // ── Entries ───────────────────────────────────────────────────────────
  for attempt in &candidate.attempts {
    let stage = course_stages.get(attempt.code.as_str()).and_then(|(_, s)| *s);
    let (course_id, course_conflicts) = resolver::resolve_course(
      tx,
      &attempt.code,
      &attempt.name,
      attempt.credits,
      stage,
    )?;
    conflicts.extend(course_conflicts);

    let time_id = match times.get(&attempt.period) {
      Some(&id) => id,
      None => {
        let id = resolver::resolve_time(tx, attempt.period)?;
        times.insert(attempt.period, id);
        id
      }
    };

    let (grade_id, _) = resolver::find_grade(tx, &attempt.grade)?
      .ok_or_else(|| LoadError::UnknownGrade(attempt.grade.clone()))?;

    let previous: Option<String> = tx
      .query_row(
        "SELECT g.letter
         FROM TranscriptEntry e JOIN Grade g ON g.grade_id = e.grade_id
         WHERE e.student_id = ?1 AND e.course_id = ?2 AND e.time_id = ?3",
        params![student_id, course_id, time_id],
        |r| r.get(0),
      )
      .optional()?;
    if let Some(previous) = previous
      && previous != attempt.grade
    {
      conflicts.push(ResolverConflict {
        kind:     ConflictKind::EntryGrade,
        key:      format!("{nrp}/{}/{}", attempt.code, attempt.period),
        previous,
        current:  attempt.grade.clone(),
      });
    }

    let entry_id: i64 = tx.query_row(
      "INSERT INTO TranscriptEntry (
         student_id, course_id, grade_id, time_id, credits, weighted_contribution
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
       ON CONFLICT (student_id, course_id, time_id) DO UPDATE SET
         grade_id              = excluded.grade_id,
         credits               = excluded.credits,
         weighted_contribution = excluded.weighted_contribution
       RETURNING entry_id",
      params![
        student_id,
        course_id,
        grade_id,
        time_id,
        attempt.credits,
        attempt.weighted_contribution(),
      ],
      |r| r.get(0),
    )?;
    kept.insert(entry_id);
  }

  // ── Stale entries ─────────────────────────────────────────────────────
  let existing: Vec<i64> = {
    let mut stmt =
      tx.prepare("SELECT entry_id FROM TranscriptEntry WHERE student_id = ?1")?;
    stmt
      .query_map(params![student_id], |r| r.get(0))?
      .collect::<rusqlite::Result<Vec<_>>>()?
  };
  let mut entries_removed = 0;
  for entry_id in existing.into_iter().filter(|id| !kept.contains(id)) {
    entries_removed +=
      tx.execute("DELETE FROM TranscriptEntry WHERE entry_id = ?1", params![entry_id])?;
  }

  // ── Summaries ─────────────────────────────────────────────────────────
  tx.execute(
    "DELETE FROM SemesterSummary WHERE student_id = ?1",
    params![student_id],
  )?;
  for semester in &candidate.metrics.semesters {
    let time_id = match times.get(&semester.period) {
      Some(&id) => id,
      None => resolver::resolve_time(tx, semester.period)?,
    };
    tx.execute(
      "INSERT INTO SemesterSummary (
         student_id, time_id, credits_taken, semester_gpa, cumulative_gpa
       ) VALUES (?1, ?2, ?3, ?4, ?5)",
      params![
        student_id,
        time_id,
        semester.credits_taken,
        semester.semester_gpa,
        semester.cumulative_gpa,
      ],
    )?;
  }

  // ── Ingestion log ─────────────────────────────────────────────────────
  let warnings: Vec<Diagnostic> = candidate
    .diagnostics
    .iter()
    .cloned()
    .chain(conflicts.iter().cloned().map(Diagnostic::from))
    .collect();
  tx.execute(
    "INSERT INTO IngestionLog (
       run_id, source_file, nrp, ingested_at, entries_loaded, warnings
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    params![
      encode_uuid(run_id),
      candidate.source,
      nrp,
      encode_dt(now),
      kept.len(),
      encode_warnings(&warnings)?,
    ],
  )?;

  Ok(LoadReport {
    student_id,
    entries_written: kept.len(),
    entries_removed,
    summaries_written: candidate.metrics.semesters.len(),
    conflicts,
  })
}
