//! Metric calculator: per-semester and cumulative GPA/credit aggregates,
//! cross-checked against the totals printed on the transcript.
//!
//! Pipeline:
//!   Vec<CourseAttempt>
//!     └─ collapse_duplicates()  → one attempt per (code, period)
//!          └─ assign_stages()     → every attempt gets a stage
//!               └─ semester_metrics() → IPS + running IPK per period
//!                    └─ stage_metrics()  → preparatory / degree split
//!                         └─ validate()      → ValidationWarning per divergence

use std::collections::{BTreeSet, HashMap};

use crate::{
  config::IngestConfig,
  diagnostic::{CreditScope, Diagnostic, GpaScope, ValidationWarning},
  dimension::{Stage, StageAggregate, TimePeriodKey},
  transcript::{CourseAttempt, PrintedSummary, SemesterMetrics, TranscriptMetrics},
};

/// Output of [`calculate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Calculation {
  /// Attempts after duplicate collapsing, in their original order, each with
  /// its stage resolved.
  pub attempts:    Vec<CourseAttempt>,
  pub metrics:     TranscriptMetrics,
  pub diagnostics: Vec<Diagnostic>,
}

/// Running Σcredits / Σ(credits × weight) pair.
#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
  credits: u32,
  points:  f64,
}

impl Accumulator {
  fn add(&mut self, attempt: &CourseAttempt) {
    // Zero-credit rows carry no weight in any GPA.
    if attempt.credits == 0 {
      return;
    }
    self.credits += attempt.credits;
    self.points += attempt.weighted_contribution();
  }

  fn gpa(&self) -> f64 {
    if self.credits == 0 {
      0.0
    } else {
      self.points / f64::from(self.credits)
    }
  }
}

/// Compute every aggregate for one transcript.
pub fn calculate(
  attempts: Vec<CourseAttempt>,
  printed: &PrintedSummary,
  config: &IngestConfig,
) -> Calculation {
  let mut diagnostics = Vec::new();
  let mut attempts = collapse_duplicates(attempts, &mut diagnostics);
  assign_stages(&mut attempts, config);

  let semesters = semester_metrics(&attempts);
  let (preparatory, degree) = stage_metrics(&attempts);

  let mut total = Accumulator::default();
  let mut credits_taken = 0;
  let mut credits_passed = 0;
  for attempt in &attempts {
    total.add(attempt);
    credits_taken += attempt.credits;
    if !config.is_failing(&attempt.grade) {
      credits_passed += attempt.credits;
    }
  }

  let metrics = TranscriptMetrics {
    semesters,
    cumulative_gpa: total.gpa(),
    credits_taken,
    credits_passed,
    preparatory,
    degree,
  };

  diagnostics.extend(validate(&metrics, printed, config.gpa_tolerance));

  Calculation { attempts, metrics, diagnostics }
}

/// Keep one attempt per (course code, period); a later row replaces an earlier
/// one in place.
fn collapse_duplicates(
  attempts: Vec<CourseAttempt>,
  diagnostics: &mut Vec<Diagnostic>,
) -> Vec<CourseAttempt> {
  let mut kept: Vec<CourseAttempt> = Vec::with_capacity(attempts.len());
  let mut index: HashMap<(String, TimePeriodKey), usize> = HashMap::new();

  for attempt in attempts {
    let key = (attempt.code.clone(), attempt.period);
    if let Some(&i) = index.get(&key) {
      diagnostics.push(Diagnostic::DuplicateAttempt {
        code:    attempt.code.clone(),
        period:  attempt.period,
        dropped: kept[i].location,
        kept:    attempt.location,
      });
      kept[i] = attempt;
    } else {
      index.insert(key, kept.len());
      kept.push(attempt);
    }
  }

  kept
}

fn semester_metrics(attempts: &[CourseAttempt]) -> Vec<SemesterMetrics> {
  let periods: BTreeSet<TimePeriodKey> =
    attempts.iter().map(|a| a.period).collect();

  let mut running = Accumulator::default();
  periods
    .into_iter()
    .map(|period| {
      let mut semester = Accumulator::default();
      let mut credits_taken = 0;
      for attempt in attempts.iter().filter(|a| a.period == period) {
        semester.add(attempt);
        running.add(attempt);
        credits_taken += attempt.credits;
      }
      SemesterMetrics {
        period,
        credits_taken,
        semester_gpa: semester.gpa(),
        cumulative_gpa: running.gpa(),
      }
    })
    .collect()
}

/// Give every attempt a stage.
///
/// When the transcript marks its stage sections, those marks win and rows
/// printed before the first mark count as preparatory. Otherwise the split
/// falls back to the configured semester-index threshold.
fn assign_stages(attempts: &mut [CourseAttempt], config: &IngestConfig) {
  let demarcated = attempts.iter().any(|a| a.stage.is_some());
  let order: Vec<TimePeriodKey> = attempts
    .iter()
    .map(|a| a.period)
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect();

  for attempt in attempts {
    let stage = if demarcated {
      attempt.stage.unwrap_or(Stage::Preparatory)
    } else {
      let semester_index = order
        .iter()
        .position(|p| *p == attempt.period)
        .map_or(0, |i| i + 1);
      if semester_index <= config.preparatory_semesters as usize {
        Stage::Preparatory
      } else {
        Stage::Degree
      }
    };
    attempt.stage = Some(stage);
  }
}

fn stage_metrics(attempts: &[CourseAttempt]) -> (StageAggregate, StageAggregate) {
  let mut preparatory = Accumulator::default();
  let mut degree = Accumulator::default();
  let mut preparatory_credits = 0;
  let mut degree_credits = 0;

  for attempt in attempts {
    if attempt.stage == Some(Stage::Degree) {
      degree.add(attempt);
      degree_credits += attempt.credits;
    } else {
      preparatory.add(attempt);
      preparatory_credits += attempt.credits;
    }
  }

  (
    StageAggregate { gpa: preparatory.gpa(), credits: preparatory_credits },
    StageAggregate { gpa: degree.gpa(), credits: degree_credits },
  )
}

fn validate(
  metrics: &TranscriptMetrics,
  printed: &PrintedSummary,
  tolerance: f64,
) -> Vec<Diagnostic> {
  let mut warnings = Vec::new();

  if !printed.footer_present {
    warnings.push(ValidationWarning::FooterMissing);
  }

  let gpa_checks = [
    (GpaScope::Cumulative, printed.cumulative_gpa, metrics.cumulative_gpa),
    (GpaScope::Preparatory, printed.preparatory_gpa, metrics.preparatory.gpa),
    (GpaScope::Degree, printed.degree_gpa, metrics.degree.gpa),
  ];
  for (scope, printed, computed) in gpa_checks {
    if let Some(printed) = printed
      && (printed - computed).abs() > tolerance
    {
      warnings.push(ValidationWarning::GpaMismatch { scope, printed, computed });
    }
  }

  for semester in &metrics.semesters {
    if let Some(&printed) = printed.semester_gpa.get(&semester.period)
      && (printed - semester.semester_gpa).abs() > tolerance
    {
      warnings.push(ValidationWarning::GpaMismatch {
        scope: GpaScope::Semester(semester.period),
        printed,
        computed: semester.semester_gpa,
      });
    }
  }

  let credit_checks = [
    (CreditScope::Taken, printed.credits_taken, metrics.credits_taken),
    (CreditScope::Passed, printed.credits_passed, metrics.credits_passed),
    (
      CreditScope::Preparatory,
      printed.preparatory_credits,
      metrics.preparatory.credits,
    ),
    (CreditScope::Degree, printed.degree_credits, metrics.degree.credits),
  ];
  for (scope, printed, computed) in credit_checks {
    if let Some(printed) = printed
      && printed != computed
    {
      warnings.push(ValidationWarning::CreditMismatch {
        scope,
        printed,
        computed,
      });
    }
  }

  warnings.into_iter().map(Diagnostic::Validation).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{dimension::Term, transcript::SourceLocation};

  fn attempt(
    code: &str,
    credits: u32,
    grade: &str,
    period: TimePeriodKey,
    line: u32,
  ) -> CourseAttempt {
    let config = IngestConfig::default();
    CourseAttempt {
      code: code.into(),
      name: format!("Course {code}"),
      credits,
      grade: grade.into(),
      grade_weight: config.grades.weight(grade).unwrap(),
      period,
      stage: None,
      location: SourceLocation { page: 1, line },
    }
  }

  fn gasal(year: i32) -> TimePeriodKey { TimePeriodKey::new(year, Term::Gasal) }

  fn genap(year: i32) -> TimePeriodKey { TimePeriodKey::new(year, Term::Genap) }

  fn footer() -> PrintedSummary {
    PrintedSummary { footer_present: true, ..PrintedSummary::default() }
  }

  #[test]
  fn two_semesters_a_then_b() {
    let attempts = vec![
      attempt("EF234101", 4, "A", gasal(2020), 1),
      attempt("EF234102", 4, "B", genap(2020), 2),
    ];
    let calc = calculate(attempts, &footer(), &IngestConfig::default());

    let semesters = &calc.metrics.semesters;
    assert_eq!(semesters.len(), 2);
    assert_eq!(semesters[0].semester_gpa, 4.0);
    assert_eq!(semesters[0].cumulative_gpa, 4.0);
    assert_eq!(semesters[1].semester_gpa, 3.0);
    assert_eq!(semesters[1].cumulative_gpa, 3.5);
    assert_eq!(calc.metrics.cumulative_gpa, 3.5);
    assert_eq!(calc.metrics.credits_taken, 8);
    assert!(calc.diagnostics.is_empty());
  }

  #[test]
  fn cumulative_follows_period_order_not_row_order() {
    let attempts = vec![
      attempt("B", 2, "C", genap(2020), 1),
      attempt("A", 2, "A", gasal(2020), 2),
    ];
    let calc = calculate(attempts, &footer(), &IngestConfig::default());
    assert_eq!(calc.metrics.semesters[0].period, gasal(2020));
    assert_eq!(calc.metrics.semesters[0].cumulative_gpa, 4.0);
    assert_eq!(calc.metrics.semesters[1].cumulative_gpa, 3.0);
  }

  #[test]
  fn retake_counts_both_attempts() {
    let attempts = vec![
      attempt("EF234101", 3, "E", gasal(2020), 1),
      attempt("EF234101", 3, "A", gasal(2021), 2),
    ];
    let calc = calculate(attempts, &footer(), &IngestConfig::default());
    assert_eq!(calc.attempts.len(), 2);
    assert_eq!(calc.metrics.cumulative_gpa, 2.0);
    assert_eq!(calc.metrics.credits_taken, 6);
    assert_eq!(calc.metrics.credits_passed, 3);
  }

  #[test]
  fn duplicate_row_in_same_period_is_collapsed() {
    let attempts = vec![
      attempt("EF234101", 3, "C", gasal(2020), 4),
      attempt("EF234101", 3, "B", gasal(2020), 9),
    ];
    let calc = calculate(attempts, &footer(), &IngestConfig::default());
    assert_eq!(calc.attempts.len(), 1);
    assert_eq!(calc.attempts[0].grade, "B");
    assert!(matches!(
      calc.diagnostics.as_slice(),
      [Diagnostic::DuplicateAttempt { dropped, kept, .. }]
        if dropped.line == 4 && kept.line == 9
    ));
  }

  #[test]
  fn zero_credit_rows_do_not_move_gpa() {
    let config = IngestConfig { min_credits: 0, ..IngestConfig::default() };
    let attempts = vec![
      attempt("A", 3, "B", gasal(2020), 1),
      attempt("Z", 0, "E", gasal(2020), 2),
    ];
    let calc = calculate(attempts, &footer(), &config);
    assert_eq!(calc.metrics.semesters[0].semester_gpa, 3.0);
    assert_eq!(calc.metrics.cumulative_gpa, 3.0);
  }

  #[test]
  fn stage_split_by_threshold_when_undemarcated() {
    let attempts = || {
      vec![
        attempt("A", 2, "A", gasal(2020), 1),
        attempt("B", 2, "B", genap(2020), 2),
        attempt("C", 2, "C", gasal(2021), 3),
      ]
    };
    let calc = calculate(attempts(), &footer(), &IngestConfig::default());
    assert_eq!(calc.metrics.preparatory.credits, 4);
    assert_eq!(calc.metrics.preparatory.gpa, 3.5);
    assert_eq!(calc.metrics.degree.credits, 2);
    assert_eq!(calc.metrics.degree.gpa, 2.0);
    let stages: Vec<_> = calc.attempts.iter().map(|a| a.stage).collect();
    assert_eq!(stages, vec![
      Some(Stage::Preparatory),
      Some(Stage::Preparatory),
      Some(Stage::Degree),
    ]);

    let config = IngestConfig { preparatory_semesters: 1, ..IngestConfig::default() };
    let calc = calculate(attempts(), &footer(), &config);
    assert_eq!(calc.metrics.preparatory.credits, 2);
    assert_eq!(calc.metrics.degree.credits, 4);
  }

  #[test]
  fn document_stage_marks_override_threshold() {
    let mut first = attempt("A", 2, "A", gasal(2020), 1);
    first.stage = None;
    let mut second = attempt("B", 2, "B", genap(2020), 2);
    second.stage = Some(Stage::Degree);
    let calc = calculate(vec![first, second], &footer(), &IngestConfig::default());
    // Unmarked rows before the first mark count as preparatory.
    assert_eq!(calc.metrics.preparatory.credits, 2);
    assert_eq!(calc.metrics.degree.credits, 2);
    assert_eq!(calc.metrics.degree.gpa, 3.0);
    assert_eq!(calc.attempts[0].stage, Some(Stage::Preparatory));
  }

  #[test]
  fn missing_footer_is_reported_once() {
    let attempts = vec![attempt("A", 3, "A", gasal(2020), 1)];
    let calc = calculate(attempts, &PrintedSummary::default(), &IngestConfig::default());
    assert_eq!(calc.diagnostics, vec![Diagnostic::Validation(
      ValidationWarning::FooterMissing
    )]);
    assert_eq!(calc.metrics.cumulative_gpa, 4.0);
  }

  #[test]
  fn printed_values_within_tolerance_are_accepted() {
    let attempts = vec![
      attempt("A", 3, "A", gasal(2020), 1),
      attempt("B", 3, "BC", gasal(2020), 2),
    ];
    let printed = PrintedSummary {
      cumulative_gpa: Some(3.25),
      credits_taken: Some(6),
      credits_passed: Some(6),
      ..footer()
    };
    let calc = calculate(attempts, &printed, &IngestConfig::default());
    assert!(calc.diagnostics.is_empty());
  }

  #[test]
  fn mismatches_keep_computed_values() {
    let attempts = vec![
      attempt("A", 3, "A", gasal(2020), 1),
      attempt("B", 3, "D", genap(2020), 2),
    ];
    let mut printed = PrintedSummary {
      cumulative_gpa: Some(2.75),
      credits_passed: Some(6),
      ..footer()
    };
    printed.semester_gpa.insert(genap(2020), 1.5);
    let calc = calculate(attempts, &printed, &IngestConfig::default());

    assert_eq!(calc.metrics.cumulative_gpa, 2.5);
    assert!(calc.diagnostics.contains(&Diagnostic::Validation(
      ValidationWarning::GpaMismatch {
        scope:    GpaScope::Cumulative,
        printed:  2.75,
        computed: 2.5,
      }
    )));
    assert!(calc.diagnostics.contains(&Diagnostic::Validation(
      ValidationWarning::GpaMismatch {
        scope:    GpaScope::Semester(genap(2020)),
        printed:  1.5,
        computed: 1.0,
      }
    )));
    assert!(calc.diagnostics.contains(&Diagnostic::Validation(
      ValidationWarning::CreditMismatch {
        scope:    CreditScope::Passed,
        printed:  6,
        computed: 3,
      }
    )));
  }

  #[test]
  fn latest_semester_cumulative_matches_total() {
    let attempts = vec![
      attempt("A", 3, "AB", gasal(2019), 1),
      attempt("B", 2, "C", genap(2019), 2),
      attempt("C", 4, "B", gasal(2020), 3),
      attempt("D", 1, "E", gasal(2020), 4),
    ];
    let calc = calculate(attempts, &footer(), &IngestConfig::default());
    let last = calc.metrics.semesters.last().unwrap();
    assert_eq!(last.cumulative_gpa, calc.metrics.cumulative_gpa);
  }
}
