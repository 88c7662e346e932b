//! Keyword routing of a free-text message into a [`RequestType`].
//!
//! Classification is plain case-insensitive substring membership against four
//! static keyword lists, tested in a fixed priority order:
//! fill_form, analysis, document, table. The first list with a hit wins and
//! a message that hits none of them is ordinary chat.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// What the user is asking the relay to produce.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RequestType {
  FillForm,
  Analysis,
  Document,
  Table,
  #[default]
  Chat,
}

impl RequestType {
  /// Whether the reply to this request is rendered as a PDF artifact
  /// regardless of its length.
  pub fn wants_pdf(self) -> bool { matches!(self, Self::Document | Self::Analysis) }
}

// ─── Keyword lists ───────────────────────────────────────────────────────────

pub const FILL_FORM_KEYWORDS: &[&str] = &[
  "fill out",
  "fill in",
  "fill the",
  "fill this",
  "complete the form",
  "complete this form",
  "fill",
];

pub const ANALYSIS_KEYWORDS: &[&str] = &[
  "analyze",
  "analyse",
  "analysis",
  "review this",
  "review the",
  "review my",
  "evaluate",
  "assess",
  "break down",
  "breakdown",
];

pub const DOCUMENT_KEYWORDS: &[&str] = &[
  "generate document",
  "create document",
  "prepare document",
  "draft agreement",
  "create agreement",
  "prepare petition",
  "generate pdf",
  "create pdf",
  "make document",
  "prepare contract",
  "draft contract",
  "create legal document",
  "draft",
  "prepare",
  "create petition",
  "generate agreement",
  "make agreement",
  "write document",
  "compose document",
];

pub const TABLE_KEYWORDS: &[&str] = &[
  "create table",
  "generate table",
  "make table",
  "create chart",
  "generate chart",
  "show table",
  "table format",
  "tabular",
  "spreadsheet",
  "table of",
  "as a table",
  "csv",
];

/// Priority order of the keyword lists; earlier entries win ties.
const RULES: &[(RequestType, &[&str])] = &[
  (RequestType::FillForm, FILL_FORM_KEYWORDS),
  (RequestType::Analysis, ANALYSIS_KEYWORDS),
  (RequestType::Document, DOCUMENT_KEYWORDS),
  (RequestType::Table, TABLE_KEYWORDS),
];

/// Classify `message` into exactly one [`RequestType`].
pub fn classify(message: &str) -> RequestType {
  let lowered = message.to_lowercase();
  if lowered.trim().is_empty() {
    return RequestType::Chat;
  }

  RULES
    .iter()
    .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
    .map(|(kind, _)| *kind)
    .unwrap_or(RequestType::Chat)
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  #[test]
  fn draft_request_is_document() {
    assert_eq!(
      classify("Please draft a non-disclosure agreement"),
      RequestType::Document
    );
  }

  #[test]
  fn table_request_is_table() {
    assert_eq!(classify("create table of filing deadlines"), RequestType::Table);
    assert_eq!(classify("Put this in a SPREADSHEET"), RequestType::Table);
  }

  #[test]
  fn plain_question_is_chat() {
    assert_eq!(classify("What is Virginia Code?"), RequestType::Chat);
  }

  #[test]
  fn blank_message_is_chat() {
    assert_eq!(classify(""), RequestType::Chat);
    assert_eq!(classify("   \n\t "), RequestType::Chat);
  }

  #[test]
  fn fill_beats_document() {
    assert_eq!(
      classify("Fill in the blanks and generate document for my lease"),
      RequestType::FillForm
    );
  }

  #[test]
  fn analysis_beats_document() {
    assert_eq!(classify("analyze and draft this"), RequestType::Analysis);
  }

  #[test]
  fn document_beats_table() {
    assert_eq!(
      classify("prepare a spreadsheet of my assets"),
      RequestType::Document
    );
  }

  #[test]
  fn matching_is_case_insensitive() {
    assert_eq!(classify("EVALUATE MY LEASE"), RequestType::Analysis);
  }

  #[test]
  fn matching_is_exact_substring_only() {
    // "drafting" contains "draft"; "drafts" too. "dr aft" does not.
    assert_eq!(classify("tips for drafting"), RequestType::Document);
    assert_eq!(classify("dr aft"), RequestType::Chat);
    // "filing" does not contain "fill".
    assert_eq!(classify("filing deadlines?"), RequestType::Chat);
  }

  #[test]
  fn classification_is_stable() {
    let msg = "Could you review the attached lease and create table of terms";
    assert_eq!(classify(msg), classify(msg));
  }

  #[test]
  fn tags_round_trip_through_strings() {
    assert_eq!(RequestType::FillForm.to_string(), "fill_form");
    assert_eq!(RequestType::from_str("table").unwrap(), RequestType::Table);
    assert_eq!(
      serde_json::to_string(&RequestType::Analysis).unwrap(),
      "\"analysis\""
    );
  }
}
