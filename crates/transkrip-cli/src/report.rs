//! Structured warnings per file and the closing batch summary.

use std::fmt::Write as _;

use transkrip_core::diagnostic::{Diagnostic, ResolverConflict};

use crate::batch::BatchSummary;

pub fn log_diagnostics(file: &str, diagnostics: &[Diagnostic]) {
  for diagnostic in diagnostics {
    let kind = diagnostic.kind();
    match diagnostic.location() {
      Some(at) => {
        tracing::warn!(file, page = at.page, line = at.line, kind, "{diagnostic}")
      }
      None => tracing::warn!(file, kind, "{diagnostic}"),
    }
  }
}

pub fn log_conflicts(file: &str, conflicts: &[ResolverConflict]) {
  for conflict in conflicts {
    tracing::warn!(
      file,
      kind = "resolver_conflict",
      conflict = %conflict.kind,
      key = %conflict.key,
      "{conflict}"
    );
  }
}

/// One line per file followed by the totals.
pub fn render_summary(summary: &BatchSummary) -> String {
  let mut out = String::new();
  for outcome in &summary.outcomes {
    let name = outcome.file.display();
    let _ = match &outcome.result {
      Ok(load) => writeln!(
        out,
        "ok    {name} ({} entries, {} warnings)",
        load.entries_written,
        outcome.diagnostics + load.conflicts.len(),
      ),
      Err(e) => writeln!(out, "FAIL  {name}: {e}"),
    };
  }
  let _ = write!(
    out,
    "{} files, {} loaded, {} failed (run {})",
    summary.outcomes.len(),
    summary.loaded(),
    summary.failed(),
    summary.run_id,
  );
  out
}

pub fn print_summary(summary: &BatchSummary) {
  println!("{}", render_summary(summary));
  tracing::info!(
    run_id = %summary.run_id,
    loaded = summary.loaded(),
    failed = summary.failed(),
    "batch finished"
  );
}
