//! Course-row parser.
//!
//! A row is `CODE name… CREDITS [YYYY/Gs|Gn[/X]] GRADE`. The name may be any
//! number of tokens, including none; everything else is positional from the
//! two ends of the line.

use transkrip_core::{
  config::IngestConfig,
  diagnostic::RowParseError,
  dimension::TimePeriodKey,
};

use crate::anchor::{COURSE_CODE, history_token};

/// Fields of one valid course row.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
  pub code:         String,
  pub name:         String,
  pub credits:      u32,
  pub grade:        String,
  pub grade_weight: f64,
  /// Period from the row's own history token, if it has one.
  pub period:       Option<TimePeriodKey>,
}

/// Minimum token count: code, credits, grade.
const MIN_TOKENS: usize = 3;

pub fn parse_row(
  text: &str,
  config: &IngestConfig,
) -> Result<ParsedRow, RowParseError> {
  let tokens: Vec<&str> = text.split_whitespace().collect();
  let too_few = || RowParseError::TooFewTokens {
    expected: MIN_TOKENS,
    found:    tokens.len(),
  };

  let (&code, rest) = tokens.split_first().ok_or_else(too_few)?;
  if !COURSE_CODE.is_match(code) {
    return Err(RowParseError::InvalidCourseCode { code: code.to_owned() });
  }

  let (&last, mut rest) = rest.split_last().ok_or_else(too_few)?;

  // The grade column is normally its own token; a history token as the last
  // token carries the grade of that attempt instead.
  let (grade, mut period) = match history_token(last) {
    Some(token) => match token.grade {
      Some(grade) => (grade, Some(token.period)),
      None => return Err(RowParseError::UnknownGrade { grade: last.to_owned() }),
    },
    None => (last.to_owned(), None),
  };

  if period.is_none()
    && let Some((&candidate, head)) = rest.split_last()
    && let Some(token) = history_token(candidate)
  {
    period = Some(token.period);
    rest = head;
  }

  let (&credit_field, name_tokens) = rest.split_last().ok_or_else(too_few)?;
  let credits: u32 =
    credit_field
      .parse()
      .map_err(|_| RowParseError::NonNumericCredit {
        value: credit_field.to_owned(),
      })?;
  if credits < config.min_credits || credits > config.max_credits {
    return Err(RowParseError::CreditOutOfRange {
      credits,
      min: config.min_credits,
      max: config.max_credits,
    });
  }

  let grade_weight = config
    .grades
    .weight(&grade)
    .ok_or_else(|| RowParseError::UnknownGrade { grade: grade.clone() })?;

  let name = name_tokens.join(" ");
  if name.is_empty() {
    tracing::warn!(code, "course row has no name");
  }

  Ok(ParsedRow {
    code: code.to_owned(),
    name,
    credits,
    grade,
    grade_weight,
    period,
  })
}
