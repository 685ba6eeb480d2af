//! Natural key to surrogate id resolution.
//!
//! Every function runs on the caller's connection (in practice the open load
//! transaction on the single `tokio-rusqlite` thread), so two files never race
//! to create the same dimension row. A natural key seen again with different
//! attributes is updated in place and reported as a [`ResolverConflict`].

use rusqlite::{Connection, OptionalExtension as _, params};
use transkrip_core::{
  diagnostic::{ConflictKind, ResolverConflict},
  dimension::{Stage, TimePeriodKey},
  grade::GradeDef,
  transcript::{StudentProfile, TranscriptMetrics},
};

use crate::encode::{encode_stage, encode_term};

fn conflict(
  kind: ConflictKind,
  key: &str,
  previous: impl ToString,
  current: impl ToString,
) -> ResolverConflict {
  ResolverConflict {
    kind,
    key: key.to_owned(),
    previous: previous.to_string(),
    current: current.to_string(),
  }
}

// ─── Student ─────────────────────────────────────────────────────────────────

/// Insert or refresh the student row and its derived summary columns.
///
/// An empty name never overwrites a stored one.
pub fn upsert_student(
  conn: &Connection,
  profile: &StudentProfile,
  metrics: &TranscriptMetrics,
) -> rusqlite::Result<(i64, Option<ResolverConflict>)> {
  let nrp = profile.nrp.as_str();
  let existing: Option<(i64, String)> = conn
    .query_row(
      "SELECT student_id, name FROM Student WHERE nrp = ?1",
      params![nrp],
      |r| Ok((r.get(0)?, r.get(1)?)),
    )
    .optional()?;

  let Some((student_id, stored_name)) = existing else {
    conn.execute(
      "INSERT INTO Student (
         nrp, name, status, cumulative_gpa, credits_taken, credits_passed,
         preparatory_gpa, preparatory_credits, degree_gpa, degree_credits
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
      params![
        nrp,
        profile.name,
        profile.status,
        metrics.cumulative_gpa,
        metrics.credits_taken,
        metrics.credits_passed,
        metrics.preparatory.gpa,
        metrics.preparatory.credits,
        metrics.degree.gpa,
        metrics.degree.credits,
      ],
    )?;
    return Ok((conn.last_insert_rowid(), None));
  };

  let name = if profile.name.is_empty() {
    stored_name.clone()
  } else {
    profile.name.clone()
  };
  let renamed = (name != stored_name)
    .then(|| conflict(ConflictKind::StudentName, nrp, &stored_name, &name));

  conn.execute(
    "UPDATE Student SET
       name = ?2, status = ?3, cumulative_gpa = ?4, credits_taken = ?5,
       credits_passed = ?6, preparatory_gpa = ?7, preparatory_credits = ?8,
       degree_gpa = ?9, degree_credits = ?10
     WHERE student_id = ?1",
    params![
      student_id,
      name,
      profile.status,
      metrics.cumulative_gpa,
      metrics.credits_taken,
      metrics.credits_passed,
      metrics.preparatory.gpa,
      metrics.preparatory.credits,
      metrics.degree.gpa,
      metrics.degree.credits,
    ],
  )?;
  Ok((student_id, renamed))
}

// ─── Course ──────────────────────────────────────────────────────────────────

/// A `None` stage never clears a stored one.
pub fn resolve_course(
  conn: &Connection,
  code: &str,
  name: &str,
  credits: u32,
  stage: Option<Stage>,
) -> rusqlite::Result<(i64, Vec<ResolverConflict>)> {
  let stage = stage.as_ref().map(encode_stage);
  let existing: Option<(i64, String, u32, Option<String>)> = conn
    .query_row(
      "SELECT course_id, name, credits, stage FROM Course WHERE code = ?1",
      params![code],
      |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
    )
    .optional()?;

  let Some((course_id, stored_name, stored_credits, stored_stage)) = existing
  else {
    conn.execute(
      "INSERT INTO Course (code, name, credits, stage) VALUES (?1, ?2, ?3, ?4)",
      params![code, name, credits, stage],
    )?;
    return Ok((conn.last_insert_rowid(), Vec::new()));
  };

  let mut conflicts = Vec::new();
  let name = if name.is_empty() { stored_name.as_str() } else { name };
  if name != stored_name {
    conflicts.push(conflict(ConflictKind::CourseName, code, &stored_name, name));
  }
  if credits != stored_credits {
    conflicts.push(conflict(
      ConflictKind::CourseCredits,
      code,
      stored_credits,
      credits,
    ));
  }
  let filled = match (stored_stage.as_deref(), stage) {
    (Some(stored), Some(current)) if stored != current => {
      conflicts.push(conflict(ConflictKind::CourseStage, code, stored, current));
      false
    }
    (None, Some(_)) => true,
    _ => false,
  };
  if filled || !conflicts.is_empty() {
    let stage = stage.or(stored_stage.as_deref());
    conn.execute(
      "UPDATE Course SET name = ?2, credits = ?3, stage = ?4 WHERE course_id = ?1",
      params![course_id, name, credits, stage],
    )?;
  }
  Ok((course_id, conflicts))
}

// ─── Time ────────────────────────────────────────────────────────────────────

pub fn resolve_time(
  conn: &Connection,
  period: TimePeriodKey,
) -> rusqlite::Result<i64> {
  let term = encode_term(&period.term);
  conn.execute(
    "INSERT INTO TimePeriod (year, term) VALUES (?1, ?2)
     ON CONFLICT (year, term) DO NOTHING",
    params![period.year, term],
  )?;
  conn.query_row(
    "SELECT time_id FROM TimePeriod WHERE year = ?1 AND term = ?2",
    params![period.year, term],
    |r| r.get(0),
  )
}

// ─── Grade ───────────────────────────────────────────────────────────────────

/// Surrogate id and stored weight of a seeded letter grade.
pub fn find_grade(
  conn: &Connection,
  letter: &str,
) -> rusqlite::Result<Option<(i64, f64)>> {
  conn
    .query_row(
      "SELECT grade_id, weight FROM Grade WHERE letter = ?1",
      params![letter],
      |r| Ok((r.get(0)?, r.get(1)?)),
    )
    .optional()
}

pub fn seed_grade(
  conn: &Connection,
  grade: &GradeDef,
) -> rusqlite::Result<Option<ResolverConflict>> {
  match find_grade(conn, &grade.letter)? {
    None => {
      conn.execute(
        "INSERT INTO Grade (letter, weight) VALUES (?1, ?2)",
        params![grade.letter, grade.weight],
      )?;
      Ok(None)
    }
    Some((grade_id, weight)) if weight != grade.weight => {
      conn.execute(
        "UPDATE Grade SET weight = ?2 WHERE grade_id = ?1",
        params![grade_id, grade.weight],
      )?;
      Ok(Some(conflict(
        ConflictKind::GradeWeight,
        &grade.letter,
        weight,
        grade.weight,
      )))
    }
    Some(_) => Ok(None),
  }
}

#[cfg(test)]
mod tests {
  use transkrip_core::dimension::{Nrp, Term};

  use super::*;
  use crate::schema::SCHEMA;

  fn conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    conn
  }

  fn profile(name: &str) -> StudentProfile {
    StudentProfile {
      nrp:    Nrp::parse("0511184000012").unwrap(),
      name:   name.into(),
      status: None,
    }
  }

  #[test]
  fn time_periods_are_shared() {
    let conn = conn();
    let a = resolve_time(&conn, TimePeriodKey::new(2020, Term::Gasal)).unwrap();
    let b = resolve_time(&conn, TimePeriodKey::new(2020, Term::Genap)).unwrap();
    let again = resolve_time(&conn, TimePeriodKey::new(2020, Term::Gasal)).unwrap();
    assert_ne!(a, b);
    assert_eq!(a, again);
  }

  #[test]
  fn course_resighting_with_new_name_conflicts() {
    let conn = conn();
    let (id, conflicts) = resolve_course(&conn, "EF234101", "Kalkulus I", 3, None).unwrap();
    assert!(conflicts.is_empty());

    let (same, conflicts) = resolve_course(&conn, "EF234101", "Kalkulus 1", 4, None).unwrap();
    assert_eq!(id, same);
    let kinds: Vec<_> = conflicts.iter().map(|c| c.kind).collect();
    assert_eq!(kinds, vec![ConflictKind::CourseName, ConflictKind::CourseCredits]);

    let (name, credits): (String, u32) = conn
      .query_row("SELECT name, credits FROM Course WHERE course_id = ?1", [id], |r| {
        Ok((r.get(0)?, r.get(1)?))
      })
      .unwrap();
    assert_eq!((name.as_str(), credits), ("Kalkulus 1", 4));
  }

  #[test]
  fn nameless_course_keeps_stored_name() {
    let conn = conn();
    resolve_course(&conn, "EF234101", "Kalkulus", 3, None).unwrap();
    let (_, conflicts) = resolve_course(&conn, "EF234101", "", 3, None).unwrap();
    assert!(conflicts.is_empty());
  }

  fn stored_stage(conn: &Connection, id: i64) -> Option<String> {
    conn
      .query_row("SELECT stage FROM Course WHERE course_id = ?1", [id], |r| r.get(0))
      .unwrap()
  }

  #[test]
  fn course_stage_fills_then_conflicts() {
    let conn = conn();
    let (id, _) = resolve_course(&conn, "EF234101", "Kalkulus", 3, None).unwrap();
    assert_eq!(stored_stage(&conn, id), None);

    let (_, conflicts) =
      resolve_course(&conn, "EF234101", "Kalkulus", 3, Some(Stage::Preparatory))
        .unwrap();
    assert!(conflicts.is_empty());
    assert_eq!(stored_stage(&conn, id).as_deref(), Some("preparatory"));

    let (_, conflicts) =
      resolve_course(&conn, "EF234101", "Kalkulus", 3, None).unwrap();
    assert!(conflicts.is_empty());
    assert_eq!(stored_stage(&conn, id).as_deref(), Some("preparatory"));

    let (_, conflicts) =
      resolve_course(&conn, "EF234101", "Kalkulus", 3, Some(Stage::Degree)).unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].kind, ConflictKind::CourseStage);
    assert_eq!(conflicts[0].previous, "preparatory");
    assert_eq!(conflicts[0].current, "degree");
    assert_eq!(stored_stage(&conn, id).as_deref(), Some("degree"));
  }

  #[test]
  fn student_rename_is_reported() {
    let conn = conn();
    let metrics = TranscriptMetrics::default();
    let (id, none) = upsert_student(&conn, &profile("Siti"), &metrics).unwrap();
    assert!(none.is_none());

    let (same, renamed) =
      upsert_student(&conn, &profile("Siti Aminah"), &metrics).unwrap();
    assert_eq!(id, same);
    let renamed = renamed.unwrap();
    assert_eq!(renamed.kind, ConflictKind::StudentName);
    assert_eq!(renamed.key, "0511184000012");
  }

  #[test]
  fn grade_seeding_is_idempotent() {
    let conn = conn();
    let b = GradeDef { letter: "B".into(), weight: 3.0 };
    assert!(seed_grade(&conn, &b).unwrap().is_none());
    assert!(seed_grade(&conn, &b).unwrap().is_none());

    let reweighted = GradeDef { letter: "B".into(), weight: 3.25 };
    let conflict = seed_grade(&conn, &reweighted).unwrap().unwrap();
    assert_eq!(conflict.kind, ConflictKind::GradeWeight);
    assert_eq!(find_grade(&conn, "B").unwrap().map(|(_, w)| w), Some(3.25));
  }
}
