//! Textual normalisation of model replies.
//!
//! Guarantees the fixed preamble, a `Key Components` header, and bold
//! markers on recognised section headers and bullet labels. There is no
//! semantic check that the model actually followed the mandated structure.
//! [`format_response`] is idempotent.

use std::sync::LazyLock;

use regex::Regex;

/// Fixed opening line of every formatted reply.
pub const PREAMBLE: &str = "Thank you for reaching out to Legal Chat Bot.";

/// Header introducing the bulleted components of a default-persona reply.
pub const KEY_COMPONENTS_HEADER: &str = "**Key Components:**";

/// Section headers rendered in bold when they stand alone on a line.
pub const KNOWN_HEADERS: &[&str] = &[
  "Overview",
  "Summary",
  "Context",
  "Background",
  "Key Components",
  "Analysis",
  "Document Structure",
  "Structure",
  "Key Provisions",
  "Risk Assessment",
  "Risks",
  "Recommendations",
  "Next Steps",
  "Conclusion",
  "Disclaimer",
  "Parties",
  "Definitions",
  "Obligations",
  "Termination",
  "Governing Law",
];

static PARAGRAPH_BREAK: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\n[ \t]*\n").expect("valid regex"));

// indent, marker, label, remainder
static BULLET_LABEL: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^(\s*)([-*•]|\d+[.)])\s+([A-Z][A-Za-z0-9 ,/&'()\-]{0,60}?):\s+(\S.*)$")
    .expect("valid regex")
});

/// Normalise a raw model reply.
pub fn format_response(raw: &str) -> String {
  let normalized = raw.replace("\r\n", "\n");
  let trimmed = normalized.trim();
  let body = trimmed
    .strip_prefix(PREAMBLE)
    .map(str::trim_start)
    .unwrap_or(trimmed);

  let body = if body.is_empty() || has_key_components(body) {
    body.to_string()
  } else {
    insert_key_components(body)
  };

  let body = bold_pass(&body);
  if body.is_empty() {
    PREAMBLE.to_string()
  } else {
    format!("{PREAMBLE}\n\n{body}")
  }
}

/// Remove the preamble (and the blank line after it), if present.
pub fn strip_preamble(text: &str) -> &str {
  let trimmed = text.trim_start();
  trimmed
    .strip_prefix(PREAMBLE)
    .map(str::trim_start)
    .unwrap_or(trimmed)
}

fn has_key_components(text: &str) -> bool {
  text.to_lowercase().contains("key components")
}

/// Insert the header after the second paragraph, or at the end when the body
/// has fewer paragraphs.
fn insert_key_components(body: &str) -> String {
  let mut paragraphs: Vec<&str> = PARAGRAPH_BREAK
    .split(body)
    .map(str::trim_end)
    .filter(|p| !p.trim().is_empty())
    .collect();
  let at = paragraphs.len().min(2);
  paragraphs.insert(at, KEY_COMPONENTS_HEADER);
  paragraphs.join("\n\n")
}

fn bold_pass(body: &str) -> String {
  body.lines().map(bold_line).collect::<Vec<_>>().join("\n")
}

fn bold_line(line: &str) -> String {
  if let Some(header) = match_header(line) {
    return format!("**{header}:**");
  }
  if let Some(caps) = BULLET_LABEL.captures(line) {
    return format!("{}{} **{}:** {}", &caps[1], &caps[2], caps[3].trim_end(), &caps[4]);
  }
  line.to_string()
}

/// Recognise `Overview`, `Overview:`, `## Overview` and similar.
fn match_header(line: &str) -> Option<&'static str> {
  let candidate = line
    .trim()
    .trim_start_matches('#')
    .trim()
    .trim_end_matches(':')
    .trim_end();
  KNOWN_HEADERS
    .iter()
    .copied()
    .find(|h| h.eq_ignore_ascii_case(candidate))
}
