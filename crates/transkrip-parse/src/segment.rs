//! Transcript segmenter.
//!
//! Pipeline:
//!   ExtractedDocument
//!     └─ anchor::classify()  → Anchor per line
//!          └─ Segmenter::feed()  → state transitions, pending-row rejoin
//!               └─ Segmenter::finish() → Segmented
//!
//! The state is carried across page boundaries untouched, so a semester block
//! split by a page break simply continues on the next page.

use std::collections::{BTreeMap, HashMap, VecDeque};

use transkrip_core::{
  diagnostic::{Diagnostic, ValidationWarning},
  dimension::{Nrp, Stage, TimePeriodKey},
  extract::ExtractedDocument,
  transcript::{PrintedSummary, SourceLocation, StudentProfile},
};

use crate::{
  anchor::{self, Anchor, PrintedFields},
  error::{Error, Result},
};

/// Lines kept before the identity anchor, for layouts that print the name
/// above the NRP.
const PREAMBLE_LINES: usize = 8;
const MAX_HEADER_LINES: usize = 16;
/// Lines a wrapped course name may spill onto.
const MAX_CONTINUATIONS: usize = 2;

// ─── Output ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
  SeekingHeader,
  InHeader,
  SeekingSemester,
  InSemesterBlock,
  SeekingFooter,
  InFooter,
  Done,
}

/// One unparsed course line.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLine {
  pub location: SourceLocation,
  pub text:     String,
  /// Stage section in effect when the row started.
  pub stage:    Option<Stage>,
}

/// Course lines filed under one time period.
#[derive(Debug, Clone, PartialEq)]
pub struct SemesterBlock {
  pub period: TimePeriodKey,
  pub lines:  Vec<RawLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segmented {
  pub student:     StudentProfile,
  /// In order of first appearance.
  pub blocks:      Vec<SemesterBlock>,
  /// Course lines with neither a heading nor a period of their own.
  pub orphans:     Vec<RawLine>,
  /// Header and footer values merged; footer values win.
  pub printed:     PrintedSummary,
  pub diagnostics: Vec<Diagnostic>,
}

/// Split a document into header, semester blocks and footer.
///
/// Fails only when no student identity can be found.
pub fn segment(doc: &ExtractedDocument, source_name: &str) -> Result<Segmented> {
  let mut segmenter = Segmenter::default();
  for (location, line) in doc.lines() {
    segmenter.feed(location, line)?;
  }
  segmenter.finish(source_name)
}

// ─── State machine ───────────────────────────────────────────────────────────

struct PendingRow {
  line:          RawLine,
  continuations: usize,
}

struct Segmenter {
  state:         State,
  preamble:      VecDeque<String>,
  header:        Vec<String>,
  student:       Option<StudentProfile>,
  header_fields: PrintedFields,
  stage:         Option<Stage>,
  /// Period of the open heading, if any.
  period:        Option<TimePeriodKey>,
  /// Period most recently given a row or heading.
  last_period:   Option<TimePeriodKey>,
  blocks:        Vec<SemesterBlock>,
  block_index:   HashMap<TimePeriodKey, usize>,
  orphans:       Vec<RawLine>,
  pending:       Option<PendingRow>,
  footer:        Vec<String>,
  /// Set while a page header repeated mid-document is being skipped; holds
  /// the cumulative GPA lines seen inside it.
  furniture:     Option<Vec<String>>,
  semester_gpa:  BTreeMap<TimePeriodKey, f64>,
}

impl Default for Segmenter {
  fn default() -> Self {
    Self {
      state:         State::SeekingHeader,
      preamble:      VecDeque::with_capacity(PREAMBLE_LINES),
      header:        Vec::new(),
      student:       None,
      header_fields: PrintedFields::default(),
      stage:         None,
      period:        None,
      last_period:   None,
      blocks:        Vec::new(),
      block_index:   HashMap::new(),
      orphans:       Vec::new(),
      pending:       None,
      footer:        Vec::new(),
      furniture:     None,
      semester_gpa:  BTreeMap::new(),
    }
  }
}

impl Segmenter {
  fn transition(&mut self, next: State) {
    if self.state != next {
      tracing::trace!(from = ?self.state, to = ?next, "segmenter state");
      self.state = next;
    }
  }

  fn feed(&mut self, location: SourceLocation, line: &str) -> Result<()> {
    let anchor = anchor::classify(line);

    match self.state {
      State::SeekingHeader => {
        if anchor == Anchor::Identity {
          self.header = self.preamble.drain(..).collect();
          self.header.push(line.to_owned());
          self.transition(State::InHeader);
        } else {
          if self.preamble.len() == PREAMBLE_LINES {
            self.preamble.pop_front();
          }
          self.preamble.push_back(line.to_owned());
        }
      }

      State::InHeader => {
        let header_line = matches!(anchor, Anchor::Other | Anchor::Identity)
          || (anchor == Anchor::Footer && anchor::is_cumulative_gpa(line));

        if anchor == Anchor::Noise {
          // Printed dates and page numbers would bleed into the name.
        } else if header_line && self.header.len() < MAX_HEADER_LINES {
          self.header.push(line.to_owned());
        } else {
          self.close_header()?;
          if self.state == State::SeekingHeader {
            return self.feed(location, line);
          }
          self.body(location, line, anchor);
        }
      }

      State::Done => {}

      State::SeekingSemester
      | State::InSemesterBlock
      | State::SeekingFooter
      | State::InFooter => self.body(location, line, anchor),
    }

    Ok(())
  }

  /// Match the accumulated header text. Without an identity the segmenter
  /// goes back to looking for one.
  fn close_header(&mut self) -> Result<()> {
    let text = self.header.join(" ");
    self.header.clear();

    let Some((nrp, name)) = anchor::identity(&text) else {
      tracing::debug!(header = %text, "header without a student identity");
      self.transition(State::SeekingHeader);
      return Ok(());
    };

    if name.is_empty() {
      tracing::warn!(nrp = %nrp, "student name missing from header");
    }
    self.student = Some(StudentProfile {
      nrp: Nrp::parse(&nrp)?,
      name,
      status: anchor::status(&text),
    });
    self.header_fields = anchor::printed_fields(&text);
    self.transition(State::SeekingSemester);
    Ok(())
  }

  fn body(&mut self, location: SourceLocation, line: &str, anchor: Anchor) {
    // A repeated header lasts until the next structural line. Its IPK copy
    // must not close the open semester block.
    if let Some(stash) = &mut self.furniture {
      match anchor {
        Anchor::Identity | Anchor::Noise | Anchor::Other => return,
        Anchor::Footer if anchor::is_cumulative_gpa(line) => {
          stash.push(line.to_owned());
          return;
        }
        _ => self.furniture = None,
      }
    }

    match anchor {
      Anchor::Stage(stage) => {
        self.flush_pending();
        self.stage = Some(stage);
        self.period = None;
        self.transition(State::SeekingSemester);
      }

      Anchor::Footer => {
        self.flush_pending();
        self.footer.push(line.to_owned());
        self.transition(State::InFooter);
      }

      Anchor::SemesterGpa(gpa) => {
        self.flush_pending();
        match self.period.or(self.last_period) {
          Some(period) => {
            self.semester_gpa.insert(period, gpa);
          }
          None => tracing::debug!(%location, "semester GPA outside any block"),
        }
        self.period = None;
        self.transition(State::SeekingFooter);
      }

      Anchor::Heading(period) => {
        self.flush_pending();
        self.period = Some(period);
        self.last_period = Some(period);
        self.block(period);
        self.transition(State::InSemesterBlock);
      }

      Anchor::Course => {
        self.flush_pending();
        self.pending = Some(PendingRow {
          line:          RawLine {
            location,
            text: line.to_owned(),
            stage: self.stage,
          },
          continuations: 0,
        });
        self.transition(State::InSemesterBlock);
      }

      Anchor::Identity => {
        self.flush_pending();
        self.furniture = Some(Vec::new());
      }

      Anchor::Noise => {}

      Anchor::Other => {
        if let Some(pending) = &mut self.pending
          && !anchor::row_is_complete(&pending.line.text)
          && pending.continuations < MAX_CONTINUATIONS
        {
          pending.line.text.push(' ');
          pending.line.text.push_str(line);
          pending.continuations += 1;
        } else if self.state == State::InFooter {
          self.footer.push(line.to_owned());
        }
      }
    }
  }

  /// File the pending row under its own period, else the open heading.
  fn flush_pending(&mut self) {
    let Some(PendingRow { line, .. }) = self.pending.take() else {
      return;
    };
    match anchor::embedded_period(&line.text).or(self.period) {
      Some(period) => {
        self.last_period = Some(period);
        self.block(period).lines.push(line);
      }
      None => self.orphans.push(line),
    }
  }

  fn block(&mut self, period: TimePeriodKey) -> &mut SemesterBlock {
    let index = *self.block_index.entry(period).or_insert_with(|| {
      self.blocks.push(SemesterBlock { period, lines: Vec::new() });
      self.blocks.len() - 1
    });
    &mut self.blocks[index]
  }

  fn finish(mut self, source_name: &str) -> Result<Segmented> {
    self.flush_pending();
    if self.state == State::InHeader {
      self.close_header()?;
    }
    // Nothing followed the last repeated header, so its IPK lines were the
    // footer after all.
    if let Some(stash) = self.furniture.take() {
      self.footer.extend(stash);
    }
    self.transition(State::Done);

    let student = self.student.ok_or_else(|| Error::MissingIdentity {
      source_name: source_name.to_owned(),
    })?;

    let header = self.header_fields;
    let footer = anchor::printed_fields(&self.footer.join(" "));
    let printed = PrintedSummary {
      cumulative_gpa:      footer.cumulative_gpa.or(header.cumulative_gpa),
      credits_taken:       footer.credits_taken.or(header.credits_taken),
      credits_passed:      footer.credits_passed.or(header.credits_passed),
      preparatory_gpa:     footer.preparatory_gpa.or(header.preparatory_gpa),
      preparatory_credits: footer
        .preparatory_credits
        .or(header.preparatory_credits),
      degree_gpa:          footer.degree_gpa.or(header.degree_gpa),
      degree_credits:      footer.degree_credits.or(header.degree_credits),
      semester_gpa:        self.semester_gpa,
      footer_present:      !self.footer.is_empty(),
    };

    let mut diagnostics = Vec::new();
    if self.blocks.is_empty() && self.orphans.is_empty() {
      diagnostics.push(Diagnostic::from(ValidationWarning::NoSemesterBlocks));
    }

    Ok(Segmented {
      student,
      blocks: self.blocks,
      orphans: self.orphans,
      printed,
      diagnostics,
    })
  }
}

#[cfg(test)]
mod tests {
  use transkrip_core::dimension::Term;

  use super::*;

  fn gasal(year: i32) -> TimePeriodKey { TimePeriodKey::new(year, Term::Gasal) }

  fn genap(year: i32) -> TimePeriodKey { TimePeriodKey::new(year, Term::Genap) }

  fn texts(block: &SemesterBlock) -> Vec<&str> {
    block.lines.iter().map(|l| l.text.as_str()).collect()
  }

  #[test]
  fn headed_layout_across_pages() {
    let doc = ExtractedDocument::from_pages([
      vec![
        "Transkrip Akademik",
        "NRP / Nama 5025201001 / Budi",
        "Santoso",
        "SKS Tempuh / SKS Lulus 12 / 12 Status Aktif",
        "Semester Gasal 2020/2021",
        "Kode Mata Kuliah SKS Nilai",
        "EF234101 Kalkulus 4 A",
        "EF234102 Pengantar Teknologi",
        "Informasi 2 AB",
        "Halaman 1 dari 2",
      ],
      vec![
        "NRP / Nama 5025201001 / Budi Santoso",
        "EF234103 Fisika 2 B",
        "IPS : 3,50",
        "Semester Genap 2020/2021",
        "EF234201 Basis Data 4 B",
        "IPS 3.00",
        "IPK 3.33",
      ],
    ]);

    let seg = segment(&doc, "budi.pdf").unwrap();
    assert_eq!(seg.student.nrp.as_str(), "5025201001");
    assert_eq!(seg.student.name, "Budi Santoso");
    assert_eq!(seg.student.status.as_deref(), Some("Aktif"));

    assert_eq!(seg.blocks.len(), 2);
    assert_eq!(seg.blocks[0].period, gasal(2020));
    assert_eq!(texts(&seg.blocks[0]), vec![
      "EF234101 Kalkulus 4 A",
      "EF234102 Pengantar Teknologi Informasi 2 AB",
      "EF234103 Fisika 2 B",
    ]);
    assert_eq!(seg.blocks[0].lines[2].location, SourceLocation {
      page: 2,
      line: 2,
    });
    assert_eq!(texts(&seg.blocks[1]), vec!["EF234201 Basis Data 4 B"]);

    assert_eq!(seg.printed.credits_taken, Some(12));
    assert_eq!(seg.printed.cumulative_gpa, Some(3.33));
    assert_eq!(seg.printed.semester_gpa.get(&gasal(2020)), Some(&3.5));
    assert_eq!(seg.printed.semester_gpa.get(&genap(2020)), Some(&3.0));
    assert!(seg.printed.footer_present);
    assert!(seg.orphans.is_empty());
    assert!(seg.diagnostics.is_empty());
  }

  #[test]
  fn history_token_layout_with_stage_sections() {
    let doc = ExtractedDocument::from_pages([vec![
      "NRP / Nama 05111840000012 / Siti Aminah SKS Tempuh / SKS Lulus 10 / 10",
      "Status Aktif",
      "Tahap: Persiapan",
      "KM184101 Matematika I 3 2018/Gs/A A",
      "KM184201 Matematika II 3 2018/Gn/AB AB",
      "IP Tahap Persiapan : 3.75",
      "Total Sks Tahap Persiapan : 6",
      "Tahap: Sarjana",
      "IF184301 Basis Data 4 2019/Gs/B B",
      "IP Tahap Sarjana : 3.00",
      "Total Sks Tahap Sarjana : 4",
      "IPK 3.45",
    ]]);

    let seg = segment(&doc, "siti.pdf").unwrap();
    assert_eq!(seg.student.nrp.as_str(), "05111840000012");
    assert_eq!(seg.student.name, "Siti Aminah");

    let periods: Vec<_> = seg.blocks.iter().map(|b| b.period).collect();
    assert_eq!(periods, vec![gasal(2018), genap(2018), gasal(2019)]);
    assert_eq!(seg.blocks[0].lines[0].stage, Some(Stage::Preparatory));
    assert_eq!(seg.blocks[2].lines[0].stage, Some(Stage::Degree));

    assert_eq!(seg.printed.preparatory_gpa, Some(3.75));
    assert_eq!(seg.printed.preparatory_credits, Some(6));
    assert_eq!(seg.printed.degree_gpa, Some(3.0));
    assert_eq!(seg.printed.degree_credits, Some(4));
    assert_eq!(seg.printed.cumulative_gpa, Some(3.45));
    assert_eq!(seg.printed.credits_passed, Some(10));
  }

  #[test]
  fn repeated_header_with_ipk_keeps_block_open() {
    let doc = ExtractedDocument::from_pages([
      vec![
        "NRP / Nama 5025201001 / Budi Santoso",
        "IPK 3.50",
        "Semester Gasal 2020/2021",
        "EF234101 Kalkulus 4 A",
      ],
      vec![
        "NRP / Nama 5025201001 / Budi Santoso",
        "SKS Tempuh / SKS Lulus 8 / 8 Status Aktif",
        "IPK 3.50",
        "EF234102 Fisika 4 B",
        "IPS 3.50",
      ],
    ]);

    let seg = segment(&doc, "budi.pdf").unwrap();
    assert_eq!(seg.blocks.len(), 1);
    assert_eq!(texts(&seg.blocks[0]), vec![
      "EF234101 Kalkulus 4 A",
      "EF234102 Fisika 4 B",
    ]);
    assert!(seg.orphans.is_empty());
    assert_eq!(seg.printed.cumulative_gpa, Some(3.5));
    assert_eq!(seg.printed.semester_gpa.get(&gasal(2020)), Some(&3.5));
    assert!(!seg.printed.footer_present);
  }

  #[test]
  fn footer_alone_on_last_page_after_repeated_header() {
    let doc = ExtractedDocument::from_pages([
      vec![
        "NRP / Nama 5025201001 / Budi Santoso",
        "Semester Gasal 2020/2021",
        "EF234101 Kalkulus 4 A",
        "IPS 4.00",
      ],
      vec!["NRP / Nama 5025201001 / Budi Santoso", "IPK 4.00"],
    ]);

    let seg = segment(&doc, "budi.pdf").unwrap();
    assert_eq!(seg.blocks[0].lines.len(), 1);
    assert!(seg.printed.footer_present);
    assert_eq!(seg.printed.cumulative_gpa, Some(4.0));
  }

  #[test]
  fn rows_without_any_period_are_orphans() {
    let doc = ExtractedDocument::from_pages([vec![
      "NRP : 5025201001",
      "Nama : Budi Santoso",
      "EF234101 Kalkulus 4 A",
    ]]);
    let seg = segment(&doc, "budi.pdf").unwrap();
    assert!(seg.blocks.is_empty());
    assert_eq!(seg.orphans.len(), 1);
    assert!(!seg.printed.footer_present);
  }

  #[test]
  fn name_above_nrp_is_kept_in_preamble() {
    let doc = ExtractedDocument::from_pages([vec![
      "Nama : Budi Santoso",
      "NRP : 5025201001",
      "Gasal 2020",
      "EF234101 Kalkulus 4 A",
    ]]);
    let seg = segment(&doc, "budi.pdf").unwrap();
    assert_eq!(seg.student.name, "Budi Santoso");
    assert_eq!(seg.blocks[0].period, gasal(2020));
  }

  #[test]
  fn empty_body_is_a_warning() {
    let doc = ExtractedDocument::from_pages([vec!["NRP / Nama 5025201001 / Budi"]]);
    let seg = segment(&doc, "budi.pdf").unwrap();
    assert_eq!(seg.diagnostics, vec![Diagnostic::Validation(
      ValidationWarning::NoSemesterBlocks
    )]);
  }

  #[test]
  fn missing_identity_is_fatal() {
    let doc = ExtractedDocument::from_pages([vec![
      "Transkrip Akademik",
      "Semester Gasal 2020/2021",
      "EF234101 Kalkulus 4 A",
    ]]);
    let err = segment(&doc, "anon.pdf").unwrap_err();
    assert!(matches!(err, Error::MissingIdentity { source_name } if source_name == "anon.pdf"));
  }
}
