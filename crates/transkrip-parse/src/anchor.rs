//! Anchor patterns that drive the segmenter.
//!
//! Lines are classified by content, never by position. [`classify`] tries the
//! rules in priority order and the first match wins, so a layout change that
//! breaks one rule degrades to more skipped lines rather than misfiled ones.

use once_cell::sync::Lazy;
use regex::Regex;
use transkrip_core::dimension::{Stage, Term, TimePeriodKey};

// ─── Line anchors ────────────────────────────────────────────────────────────

static IDENTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bNRP\b").unwrap());

static STAGE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?i)^Tahap\s*:?\s*(Persiapan|Sarjana)\b").unwrap()
});

static FOOTER: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?i)^(?:IPK\b|IP\s*Tahap\b|Total\s*Sks\s*Tahap\b)").unwrap()
});

static SEMESTER_GPA: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?i)^(?:IPS|IP\s*Semester)\b\s*:?\s*(\d+(?:[.,]\d+)?)").unwrap()
});

/// `Semester Gasal 2020/2021`
static HEADING_TERM_YEAR: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"(?i)^Semester\s+(Gasal|Ganjil|Genap)\s+(\d{4})(?:\s*/\s*\d{4})?\b",
  )
  .unwrap()
});

/// `Tahun 2020 Semester Genap`, `Tahun Ajaran 2020/2021 Semester Gasal`
static HEADING_YEAR_TERM: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"(?i)^Tahun(?:\s+Ajaran)?\s+(\d{4})(?:\s*/\s*\d{4})?\s+Semester\s+(Gasal|Ganjil|Genap)\b",
  )
  .unwrap()
});

/// `Gasal 2020`, `Genap 2020/2021`
static HEADING_BARE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?i)^(Gasal|Ganjil|Genap)\s+(\d{4})(?:\s*/\s*\d{4})?$").unwrap()
});

/// Anything that looks like it starts with a course code. Deliberately looser
/// than the code check in the row parser, so near-misses surface as
/// `InvalidCourseCode` diagnostics instead of vanishing as noise.
static COURSE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^[A-Z]{2,3}\d{4,7}\b").unwrap());

static NOISE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"(?i)^(?:halaman|hal\.|page)\s*\d+|^\d+\s*(?:/|dari|of)\s*\d+$|^(?:dicetak|printed)\b",
  )
  .unwrap()
});

// ─── Row shape ───────────────────────────────────────────────────────────────

/// `YYYY/Gs` or `YYYY/Gn`, optionally followed by the grade of that attempt.
static HISTORY_TOKEN: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^(\d{4})/(Gs|Gn|GS|GN)(?:/([A-Z]{1,2}))?$").unwrap()
});

/// A row that ends in `credits [history] grade` has all its columns.
static ROW_COMPLETE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"\s\d{1,2}(?:\s+\d{4}/(?:Gs|Gn|GS|GN)(?:/[A-Z]{1,2})?)?\s+[A-Z]{1,2}$")
    .unwrap()
});

/// Exact course code accepted by the row parser.
pub(crate) static COURSE_CODE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^[A-Z]{2}\d{5,6}$").unwrap());

// ─── Header and footer fields ────────────────────────────────────────────────

static NRP_NAME_COMBINED: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"(?i)NRP\s*/\s*Nama\s*:?\s*(\d+)\s*/\s*(.*?)\s*(?:\bSKS\s*Tempuh\b|\bStatus\b|\bIPK\b|$)",
  )
  .unwrap()
});

static NRP_ALONE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?i)\bNRP\s*:?\s*(\d+)").unwrap());

static NAME_ALONE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"(?i)\bNama(?:\s+Mahasiswa)?\s*:?\s*(.*?)\s*(?:\bNRP\b|\bSKS\s*Tempuh\b|\bStatus\b|\bIPK\b|$)",
  )
  .unwrap()
});

static CREDITS: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?i)SKS\s*Tempuh\s*/\s*SKS\s*Lulus\s*:?\s*(\d+)\s*/\s*(\d+)")
    .unwrap()
});

static STATUS: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"(?i)\bStatus\s*:?\s*(.*?)\s*(?:\bTahap\b|\bSKS\b|\bIPK\b|\bNRP\b|---|$)",
  )
  .unwrap()
});

static CUMULATIVE_GPA: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?i)\bIPK\b\s*:?\s*(\d+(?:[.,]\d+)?)").unwrap()
});

static STAGE_GPA: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?i)\bIP\s*Tahap\s*(Persiapan|Sarjana)\s*:?\s*(\d+(?:[.,]\d+)?)")
    .unwrap()
});

static STAGE_CREDITS: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?i)\bTotal\s*Sks\s*Tahap\s*(Persiapan|Sarjana)\s*:?\s*(\d+)")
    .unwrap()
});

// ─── Classification ──────────────────────────────────────────────────────────

/// What a single line is, as far as the segmenter cares.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Anchor {
  Identity,
  Stage(Stage),
  Footer,
  SemesterGpa(f64),
  Heading(TimePeriodKey),
  Course,
  Noise,
  Other,
}

/// A bare `IPK` line counts as a header field while the header is open.
pub(crate) fn is_cumulative_gpa(line: &str) -> bool {
  CUMULATIVE_GPA.is_match(line) && !STAGE_GPA.is_match(line)
}

/// Classify one normalised line.
pub(crate) fn classify(line: &str) -> Anchor {
  if let Some(c) = STAGE.captures(line)
    && let Ok(stage) = Stage::parse(&c[1])
  {
    return Anchor::Stage(stage);
  }
  if FOOTER.is_match(line) {
    return Anchor::Footer;
  }
  if let Some(c) = SEMESTER_GPA.captures(line)
    && let Some(gpa) = parse_decimal(&c[1])
  {
    return Anchor::SemesterGpa(gpa);
  }
  if let Some(period) = heading(line) {
    return Anchor::Heading(period);
  }
  if COURSE.is_match(line) {
    return Anchor::Course;
  }
  if IDENTITY.is_match(line) {
    return Anchor::Identity;
  }
  if NOISE.is_match(line) {
    return Anchor::Noise;
  }
  Anchor::Other
}

fn heading(line: &str) -> Option<TimePeriodKey> {
  let (term, year) = if let Some(c) = HEADING_TERM_YEAR.captures(line) {
    (c.get(1)?, c.get(2)?)
  } else if let Some(c) = HEADING_YEAR_TERM.captures(line) {
    (c.get(2)?, c.get(1)?)
  } else if let Some(c) = HEADING_BARE.captures(line) {
    (c.get(1)?, c.get(2)?)
  } else {
    return None;
  };
  let term = Term::parse(term.as_str()).ok()?;
  let year = year.as_str().parse().ok()?;
  Some(TimePeriodKey::new(year, term))
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

/// A parsed `YYYY/Gs[/X]` token.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HistoryToken {
  pub period: TimePeriodKey,
  pub grade:  Option<String>,
}

pub(crate) fn history_token(token: &str) -> Option<HistoryToken> {
  let c = HISTORY_TOKEN.captures(token)?;
  let year = c[1].parse().ok()?;
  let term = Term::parse(&c[2]).ok()?;
  Some(HistoryToken {
    period: TimePeriodKey::new(year, term),
    grade:  c.get(3).map(|m| m.as_str().to_owned()),
  })
}

/// The period a raw row files itself under, if it carries a history token.
pub(crate) fn embedded_period(line: &str) -> Option<TimePeriodKey> {
  line
    .split_whitespace()
    .rev()
    .find_map(history_token)
    .map(|t| t.period)
}

pub(crate) fn row_is_complete(line: &str) -> bool { ROW_COMPLETE.is_match(line) }

// ─── Field extraction ────────────────────────────────────────────────────────

/// Accepts both `3.45` and `3,45`.
pub(crate) fn parse_decimal(raw: &str) -> Option<f64> {
  raw.replace(',', ".").parse().ok()
}

/// NRP digits and the (possibly empty) name from joined header text.
pub(crate) fn identity(text: &str) -> Option<(String, String)> {
  if let Some(c) = NRP_NAME_COMBINED.captures(text) {
    return Some((c[1].to_owned(), c[2].trim().to_owned()));
  }
  let nrp = NRP_ALONE.captures(text)?[1].to_owned();
  let name = NAME_ALONE
    .captures(text)
    .map(|c| c[1].trim().to_owned())
    .unwrap_or_default();
  Some((nrp, name))
}

pub(crate) fn status(text: &str) -> Option<String> {
  STATUS
    .captures(text)
    .map(|c| c[1].trim().to_owned())
    .filter(|s| !s.is_empty())
}

/// Printed totals found anywhere in `text`.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct PrintedFields {
  pub cumulative_gpa:      Option<f64>,
  pub credits_taken:       Option<u32>,
  pub credits_passed:      Option<u32>,
  pub preparatory_gpa:     Option<f64>,
  pub preparatory_credits: Option<u32>,
  pub degree_gpa:          Option<f64>,
  pub degree_credits:      Option<u32>,
}

pub(crate) fn printed_fields(text: &str) -> PrintedFields {
  let mut fields = PrintedFields::default();

  if let Some(c) = CREDITS.captures(text) {
    fields.credits_taken = c[1].parse().ok();
    fields.credits_passed = c[2].parse().ok();
  }

  fields.cumulative_gpa = CUMULATIVE_GPA
    .captures_iter(text)
    .filter_map(|c| parse_decimal(&c[1]))
    .last();

  for c in STAGE_GPA.captures_iter(text) {
    let gpa = parse_decimal(&c[2]);
    match Stage::parse(&c[1]) {
      Ok(Stage::Preparatory) => fields.preparatory_gpa = gpa,
      Ok(Stage::Degree) => fields.degree_gpa = gpa,
      Err(_) => {}
    }
  }

  for c in STAGE_CREDITS.captures_iter(text) {
    let credits = c[2].parse().ok();
    match Stage::parse(&c[1]) {
      Ok(Stage::Preparatory) => fields.preparatory_credits = credits,
      Ok(Stage::Degree) => fields.degree_credits = credits,
      Err(_) => {}
    }
  }

  fields
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn classifies_in_priority_order() {
    assert_eq!(classify("Tahap: Sarjana"), Anchor::Stage(Stage::Degree));
    assert_eq!(classify("Tahap Persiapan"), Anchor::Stage(Stage::Preparatory));
    assert_eq!(classify("IP Tahap Persiapan : 3.40"), Anchor::Footer);
    assert_eq!(classify("Total Sks Tahap Sarjana : 110"), Anchor::Footer);
    assert_eq!(classify("IPK 3.45"), Anchor::Footer);
    assert_eq!(classify("IPS : 3,50"), Anchor::SemesterGpa(3.5));
    assert_eq!(classify("IP Semester 2.75"), Anchor::SemesterGpa(2.75));
    assert_eq!(classify("EF234101 Kalkulus 3 A"), Anchor::Course);
    assert_eq!(
      classify("NRP / Nama 5025201001 / Budi Santoso"),
      Anchor::Identity
    );
    assert_eq!(classify("Halaman 2 dari 3"), Anchor::Noise);
    assert_eq!(classify("Kode Mata Kuliah SKS Nilai"), Anchor::Other);
  }

  #[test]
  fn headings_resolve_to_start_year() {
    assert_eq!(
      classify("Semester Gasal 2020/2021"),
      Anchor::Heading(TimePeriodKey::new(2020, Term::Gasal))
    );
    assert_eq!(
      classify("Tahun 2020 Semester Genap"),
      Anchor::Heading(TimePeriodKey::new(2020, Term::Genap))
    );
    assert_eq!(
      classify("Ganjil 2019"),
      Anchor::Heading(TimePeriodKey::new(2019, Term::Gasal))
    );
  }

  #[test]
  fn history_tokens() {
    let token = history_token("2020/Gn/AB").unwrap();
    assert_eq!(token.period, TimePeriodKey::new(2020, Term::Genap));
    assert_eq!(token.grade.as_deref(), Some("AB"));
    assert_eq!(history_token("2020/Gs").unwrap().grade, None);
    assert!(history_token("2020/Gx/A").is_none());
    assert_eq!(
      embedded_period("EF234101 Kalkulus 3 2019/Gs/A A"),
      Some(TimePeriodKey::new(2019, Term::Gasal))
    );
  }

  #[test]
  fn row_completeness() {
    assert!(row_is_complete("EF234101 Kalkulus 3 A"));
    assert!(row_is_complete("EF234101 Kalkulus 3 2020/Gs/A AB"));
    assert!(!row_is_complete("EF234101 Pengantar Teknologi"));
    assert!(!row_is_complete("EF234101 Fisika I"));
  }

  #[test]
  fn identity_forms() {
    assert_eq!(
      identity("NRP / Nama 05111840000012 / Siti Aminah SKS Tempuh / SKS Lulus 20 / 18"),
      Some(("05111840000012".into(), "Siti Aminah".into()))
    );
    assert_eq!(
      identity("Nama : Budi Santoso NRP : 5025201001"),
      Some(("5025201001".into(), "Budi Santoso".into()))
    );
    assert_eq!(identity("Transkrip Akademik"), None);
  }

  #[test]
  fn header_fields() {
    let text = "NRP / Nama 5025201001 / Budi SKS Tempuh / SKS Lulus 40 / 36 \
                Status Aktif Tahap: Persiapan";
    assert_eq!(status(text).as_deref(), Some("Aktif"));
    let fields = printed_fields(text);
    assert_eq!(fields.credits_taken, Some(40));
    assert_eq!(fields.credits_passed, Some(36));
    assert_eq!(fields.cumulative_gpa, None);
  }

  #[test]
  fn footer_fields() {
    let text = "IP Tahap Persiapan : 3,40 Total Sks Tahap Persiapan : 36 \
                IP Tahap Sarjana : 3.10 Total Sks Tahap Sarjana : 108 IPK 3.20";
    let fields = printed_fields(text);
    assert_eq!(fields.preparatory_gpa, Some(3.4));
    assert_eq!(fields.preparatory_credits, Some(36));
    assert_eq!(fields.degree_gpa, Some(3.1));
    assert_eq!(fields.degree_credits, Some(108));
    assert_eq!(fields.cumulative_gpa, Some(3.2));
  }
}
