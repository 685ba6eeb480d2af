//! The `WarehouseStore` trait and its load report.
//!
//! The trait is implemented by storage backends (e.g.
//! `transkrip-store-sqlite`). The batch driver depends on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  diagnostic::ResolverConflict,
  dimension::{Course, Grade, Nrp, Student, TimePeriod},
  fact::{SemesterSummary, TranscriptEntry},
  grade::GradeTable,
  transcript::CandidateTranscript,
};

// ─── Load report ─────────────────────────────────────────────────────────────

/// What one transcript load changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
  pub student_id:        i64,
  /// Entries inserted or updated.
  pub entries_written:   usize,
  /// Entries for this student that the new transcript no longer lists.
  pub entries_removed:   usize,
  pub summaries_written: usize,
  pub conflicts:         Vec<ResolverConflict>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the star-schema warehouse.
///
/// Dimension rows are resolved by natural key and never deleted. A student's
/// facts are replaced wholesale by [`load_transcript`](Self::load_transcript),
/// which must be all-or-nothing: a failure leaves the store exactly as it was
/// before the call.
///
/// All methods return `Send` futures so the trait can be used from a
/// multi-threaded tokio runtime.
pub trait WarehouseStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Insert or update the `Grade` dimension from the configured table.
  /// Letters whose stored weight differs are updated and reported.
  fn seed_grades<'a>(
    &'a self,
    grades: &'a GradeTable,
  ) -> impl Future<Output = Result<Vec<ResolverConflict>, Self::Error>> + Send + 'a;

  /// Persist one transcript in a single transaction.
  ///
  /// Re-loading the same transcript is idempotent: the entry and summary
  /// sets afterwards equal what a single load produces.
  fn load_transcript(
    &self,
    candidate: CandidateTranscript,
    run_id: Uuid,
  ) -> impl Future<Output = Result<LoadReport, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Retrieve a student by NRP. Returns `None` if never loaded.
  fn get_student<'a>(
    &'a self,
    nrp: &'a Nrp,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + 'a;

  /// All students, ordered by NRP.
  fn list_students(
    &self,
  ) -> impl Future<Output = Result<Vec<Student>, Self::Error>> + Send + '_;

  /// All courses, ordered by code.
  fn list_courses(
    &self,
  ) -> impl Future<Output = Result<Vec<Course>, Self::Error>> + Send + '_;

  fn list_grades(
    &self,
  ) -> impl Future<Output = Result<Vec<Grade>, Self::Error>> + Send + '_;

  /// All time periods, chronologically.
  fn list_time_periods(
    &self,
  ) -> impl Future<Output = Result<Vec<TimePeriod>, Self::Error>> + Send + '_;

  /// Transcript entries for one student.
  fn entries_for(
    &self,
    student_id: i64,
  ) -> impl Future<Output = Result<Vec<TranscriptEntry>, Self::Error>> + Send + '_;

  /// Semester summaries for one student, chronologically.
  fn summaries_for(
    &self,
    student_id: i64,
  ) -> impl Future<Output = Result<Vec<SemesterSummary>, Self::Error>> + Send + '_;
}
