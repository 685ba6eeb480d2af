//! Cleanup of raw text-layer lines.
//!
//! PDF text layers scatter glyph runs: a capital is often emitted as its own
//! run (`T ahap`), and adjacent runs lose the space between them
//! (`KalkulusDasar`). These passes undo both before anything looks for
//! anchors.

use once_cell::sync::Lazy;
use regex::Regex;

static SPLIT_CAPITAL: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"\b([A-Z])\s([a-z])").unwrap());
static GLUED_WORDS: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"([a-z])([A-Z])").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Normalise one line. Returns `None` when nothing but whitespace is left.
pub fn normalize_line(raw: &str) -> Option<String> {
  let line = SPLIT_CAPITAL.replace_all(raw, "$1$2");
  let line = GLUED_WORDS.replace_all(&line, "$1 $2");
  let line = WHITESPACE.replace_all(&line, " ");
  let line = line.trim();
  (!line.is_empty()).then(|| line.to_owned())
}

/// Split a page's text into normalised, non-empty lines.
pub fn normalize_page(text: &str) -> Vec<String> {
  text.lines().filter_map(normalize_line).collect()
}
