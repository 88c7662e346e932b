//! Downloadable artifacts derived from a reply, and the rule deciding when to
//! produce one.

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::classify::RequestType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ArtifactKind {
  Pdf,
  Csv,
}

impl ArtifactKind {
  pub fn content_type(self) -> &'static str {
    match self {
      Self::Pdf => "application/pdf",
      Self::Csv => "text/csv",
    }
  }

  pub fn extension(self) -> &'static str {
    match self {
      Self::Pdf => "pdf",
      Self::Csv => "csv",
    }
  }

  /// Object-store key prefix.
  pub fn key_prefix(self) -> &'static str {
    match self {
      Self::Pdf => "legal-documents",
      Self::Csv => "tables",
    }
  }
}

/// One generated file attached to a chat reply. Exactly one of `content`
/// (base64) and `url` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputArtifact {
  #[serde(rename = "type")]
  pub kind:     ArtifactKind,
  pub title:    String,
  pub filename: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub content:  Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub url:      Option<String>,
}

/// How generated artifacts reach the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
  /// Base64 bytes embedded in the reply.
  #[default]
  Inline,
  /// Uploaded to the object store and referenced by URL.
  Upload,
}

/// Decides whether a reply gets an artifact, and of which kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPolicy {
  /// Replies longer than this many characters get a PDF whatever their
  /// request type. `None` disables the rule.
  pub long_reply_threshold: Option<usize>,
}

impl Default for ArtifactPolicy {
  fn default() -> Self { Self { long_reply_threshold: Some(2500) } }
}

impl ArtifactPolicy {
  pub fn decide(&self, request_type: RequestType, reply: &str) -> Option<ArtifactKind> {
    if request_type == RequestType::Table {
      return Some(ArtifactKind::Csv);
    }
    if request_type.wants_pdf() {
      return Some(ArtifactKind::Pdf);
    }
    match self.long_reply_threshold {
      Some(limit) if reply.chars().count() > limit => Some(ArtifactKind::Pdf),
      _ => None,
    }
  }
}

/// Human-readable artifact title, e.g. `Legal Document - Please draft a…`.
pub fn artifact_title(kind: ArtifactKind, message: &str) -> String {
  let head: String = message.chars().take(30).collect();
  let suffix = if message.chars().count() > 30 { "..." } else { "" };
  match kind {
    ArtifactKind::Pdf => format!("Legal Document - {head}{suffix}"),
    ArtifactKind::Csv => format!("Table - {head}{suffix}"),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn table_always_gets_csv() {
    let policy = ArtifactPolicy { long_reply_threshold: Some(10) };
    assert_eq!(policy.decide(RequestType::Table, "short"), Some(ArtifactKind::Csv));
    let long = "x".repeat(100);
    assert_eq!(policy.decide(RequestType::Table, &long), Some(ArtifactKind::Csv));
  }

  #[test]
  fn document_and_analysis_get_pdf() {
    let policy = ArtifactPolicy::default();
    assert_eq!(policy.decide(RequestType::Document, "x"), Some(ArtifactKind::Pdf));
    assert_eq!(policy.decide(RequestType::Analysis, "x"), Some(ArtifactKind::Pdf));
  }

  #[test]
  fn long_chat_reply_gets_pdf() {
    let policy = ArtifactPolicy { long_reply_threshold: Some(20) };
    assert_eq!(policy.decide(RequestType::Chat, "short"), None);
    let long = "y".repeat(21);
    assert_eq!(policy.decide(RequestType::Chat, &long), Some(ArtifactKind::Pdf));
    assert_eq!(policy.decide(RequestType::FillForm, &long), Some(ArtifactKind::Pdf));
  }

  #[test]
  fn threshold_can_be_disabled() {
    let policy = ArtifactPolicy { long_reply_threshold: None };
    let long = "z".repeat(100_000);
    assert_eq!(policy.decide(RequestType::Chat, &long), None);
  }

  #[test]
  fn extension_matches_display() {
    for kind in [ArtifactKind::Pdf, ArtifactKind::Csv] {
      assert_eq!(kind.extension(), kind.to_string());
    }
  }

  #[test]
  fn artifact_serialises_kind_as_type() {
    let artifact = OutputArtifact {
      kind:     ArtifactKind::Csv,
      title:    "Table - deadlines".into(),
      filename: "deadlines.csv".into(),
      content:  Some("YQ==".into()),
      url:      None,
    };
    let json = serde_json::to_value(&artifact).unwrap();
    assert_eq!(json["type"], "csv");
    assert!(json.get("url").is_none());
  }
}
