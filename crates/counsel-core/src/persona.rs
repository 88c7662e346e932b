//! Persona templates: the instructional frame placed at the top of every
//! prompt.
//!
//! Each [`PromptType`] names one mutually exclusive template. Templates are
//! plain data; [`PersonaSource`] decides where the text comes from at request
//! time.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Used when a persona cannot be loaded.
pub const FALLBACK_PERSONA: &str =
  "You are Legal Chat Bot, a professional legal assistant.";

/// Selects which persona frames the request.
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
pub enum PromptType {
  #[default]
  Default,
  ContractReview,
  Litigation,
  Compliance,
  PlainLanguage,
}

impl PromptType {
  /// Parse a client-supplied prompt type, treating unknown or empty values as
  /// the default persona.
  pub fn parse_lenient(raw: Option<&str>) -> Self {
    raw
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .and_then(|s| s.parse().ok())
      .unwrap_or_default()
  }

  /// The built-in template text for this persona.
  pub fn builtin_text(self) -> &'static str {
    match self {
      Self::Default => DEFAULT_PERSONA,
      Self::ContractReview => CONTRACT_REVIEW_PERSONA,
      Self::Litigation => LITIGATION_PERSONA,
      Self::Compliance => COMPLIANCE_PERSONA,
      Self::PlainLanguage => PLAIN_LANGUAGE_PERSONA,
    }
  }

  /// File name looked up inside a persona directory.
  pub fn file_name(self) -> String { format!("{}.txt", self.as_ref()) }
}

/// A resolved persona: which type was requested and the text to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
  pub kind: PromptType,
  pub text: String,
}

impl Persona {
  /// The compiled-in template for `kind`.
  pub fn builtin(kind: PromptType) -> Self { Self { kind, text: kind.builtin_text().to_string() } }
}

/// Where persona text is loaded from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "source", content = "path", rename_all = "snake_case")]
pub enum PersonaSource {
  /// The compiled-in template table.
  #[default]
  Builtin,
  /// `<dir>/<prompt_type>.txt`, read fresh on every request.
  Directory(PathBuf),
}

impl PersonaSource {
  /// Load the persona for `kind`. A read failure degrades to
  /// [`FALLBACK_PERSONA`] and is only logged.
  pub async fn load(&self, kind: PromptType) -> Persona {
    let text = match self {
      Self::Builtin => return Persona::builtin(kind),
      Self::Directory(dir) => {
        let path = dir.join(kind.file_name());
        match tokio::fs::read_to_string(&path).await {
          Ok(text) if !text.trim().is_empty() => text,
          Ok(_) => {
            tracing::warn!(path = %path.display(), "persona file is empty, using fallback");
            FALLBACK_PERSONA.to_string()
          }
          Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to load persona, using fallback");
            FALLBACK_PERSONA.to_string()
          }
        }
      }
    };
    Persona { kind, text }
  }
}

// ─── Templates ───────────────────────────────────────────────────────────────

// Must quote `format::PREAMBLE` and `format::KEY_COMPONENTS_HEADER` verbatim.
const DEFAULT_PERSONA: &str = concat!(
  "You are Legal Chat Bot, a professional legal assistant specialising in ",
  "United States law with particular depth in Virginia statutes and practice.\n",
  "\n",
  "RESPONSE STRUCTURE (mandatory):\n",
  "1. Begin with exactly this opening line: \"",
  "Thank you for reaching out to Legal Chat Bot.",
  "\"\n",
  "2. An opening paragraph that answers the user's question directly.\n",
  "3. A context paragraph explaining the legal background that applies.\n",
  "4. The header \"",
  "**Key Components:**",
  "\" followed by exactly four bulleted components. Each bullet starts ",
  "with a bold label such as \"- **Label:**\" and is followed by a ",
  "full-sentence explanation.\n",
  "\n",
  "Write in a clear, professional tone. Cite the knowledge base context ",
  "where it is relevant. Never invent statutes or case names. When the ",
  "question requires a licensed attorney, say so plainly.",
);

const CONTRACT_REVIEW_PERSONA: &str = concat!(
  "You are a senior contracts attorney reviewing agreements for a client. ",
  "Identify the parties, obligations, payment terms, termination rights, ",
  "indemnities and limitations of liability. Flag unusual or one-sided ",
  "clauses and suggest concrete redlines.",
);

const LITIGATION_PERSONA: &str = concat!(
  "You are a litigation associate preparing a case assessment. Explain ",
  "the applicable causes of action, procedural posture, deadlines and ",
  "evidentiary considerations, and outline the strongest arguments on ",
  "each side.",
);

const COMPLIANCE_PERSONA: &str = concat!(
  "You are a regulatory compliance officer. Map the user's situation onto ",
  "the relevant statutes and regulations, list the concrete obligations ",
  "that follow, and describe the penalties for non-compliance.",
);

const PLAIN_LANGUAGE_PERSONA: &str = concat!(
  "You explain legal matters to people without legal training. Use short ",
  "sentences and everyday words, define every legal term you must use, ",
  "and end with the practical next steps the reader can take.",
);

/// Formatting rules appended after a non-default persona's own text.
pub const SHARED_FORMAT_RULES: &str = concat!(
  "FORMATTING RULES:\n",
  "- Render section headers in bold, e.g. **Overview:**.\n",
  "- Start bullet points with a bold label, e.g. - **Deadline:** explanation.\n",
  "- Separate paragraphs with a blank line.",
);

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator;

  use super::*;
  use crate::format::{KEY_COMPONENTS_HEADER, PREAMBLE};

  #[test]
  fn default_frame_mentions_preamble_and_header() {
    let text = PromptType::Default.builtin_text();
    assert!(text.contains(PREAMBLE));
    assert!(text.contains(KEY_COMPONENTS_HEADER));
  }

  #[test]
  fn every_persona_has_text() {
    for kind in PromptType::iter() {
      assert!(!kind.builtin_text().is_empty(), "{kind} has no template");
    }
  }

  #[test]
  fn lenient_parse_defaults_unknown_values() {
    assert_eq!(PromptType::parse_lenient(Some("litigation")), PromptType::Litigation);
    assert_eq!(PromptType::parse_lenient(Some("nonsense")), PromptType::Default);
    assert_eq!(PromptType::parse_lenient(Some("  ")), PromptType::Default);
    assert_eq!(PromptType::parse_lenient(None), PromptType::Default);
  }

  #[tokio::test]
  async fn builtin_source_serves_table() {
    let persona = PersonaSource::Builtin.load(PromptType::Compliance).await;
    assert_eq!(persona.text, COMPLIANCE_PERSONA);
  }

  #[tokio::test]
  async fn directory_source_reads_fresh_file() {
    let dir = tempfile::tempdir().unwrap();
    let source = PersonaSource::Directory(dir.path().to_path_buf());
    std::fs::write(dir.path().join("litigation.txt"), "first").unwrap();
    assert_eq!(source.load(PromptType::Litigation).await.text, "first");

    std::fs::write(dir.path().join("litigation.txt"), "second").unwrap();
    assert_eq!(source.load(PromptType::Litigation).await.text, "second");
  }

  #[tokio::test]
  async fn missing_file_falls_back_to_generic_persona() {
    let dir = tempfile::tempdir().unwrap();
    let source = PersonaSource::Directory(dir.path().to_path_buf());
    let persona = source.load(PromptType::Default).await;
    assert_eq!(persona.text, FALLBACK_PERSONA);
    assert_eq!(persona.kind, PromptType::Default);
  }
}
