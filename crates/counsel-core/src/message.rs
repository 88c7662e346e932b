//! Chat messages and the session grouping derived from them.
//!
//! A session has no record of its own: it is the set of messages sharing a
//! `(user_id, session_id)` pair. Messages are immutable once written.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::classify::RequestType;

/// Maximum number of characters kept from the first message as the title.
pub const SESSION_TITLE_CHARS: usize = 50;

/// Maximum number of characters of the latest message shown in a summary.
pub const SUMMARY_PREVIEW_CHARS: usize = 100;

/// Who authored a message.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  User,
  Assistant,
}

/// One persisted turn of a conversation.
///
/// Serialised with the field names of the persisted record layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
  pub user_id:           String,
  #[serde(rename = "message_timestamp")]
  pub timestamp:         DateTime<Utc>,
  pub session_id:        String,
  #[serde(rename = "message_type")]
  pub role:              Role,
  #[serde(rename = "message_content")]
  pub content:           String,
  pub session_title:     String,
  pub model_used:        String,
  pub request_type:      RequestType,
  /// Citations returned by the knowledge base; assistant messages only.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sources:           Option<Vec<String>>,
  /// Free-text instructions supplied with the message; user messages only.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub user_instructions: Option<String>,
}

/// Listing entry for one session, taken from its most recent message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
  pub session_id:   String,
  pub title:        String,
  pub last_message: String,
  pub timestamp:    DateTime<Utc>,
  pub model_used:   String,
  pub request_type: RequestType,
}

/// Derive a session title from the first message of a session.
pub fn session_title(first_message: &str) -> String {
  if first_message.chars().count() > SESSION_TITLE_CHARS {
    let head: String = first_message.chars().take(SESSION_TITLE_CHARS).collect();
    format!("{head}...")
  } else {
    first_message.to_string()
  }
}

/// Build a session identifier from a timestamp, e.g. `session_20240131_142501`.
pub fn generate_session_id(now: DateTime<Utc>) -> String {
  format!("session_{}", now.format("%Y%m%d_%H%M%S"))
}

/// Truncate `text` to at most `max` characters, never splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> &str {
  match text.char_indices().nth(max) {
    Some((idx, _)) => &text[..idx],
    None => text,
  }
}

/// Collapse a user's messages into one summary per session.
///
/// `messages` must be ordered newest first, as returned by
/// [`ChatStore::user_messages`](crate::store::ChatStore::user_messages); the
/// first message seen for each session provides its summary.
pub fn summarize_sessions(messages: &[Message]) -> Vec<SessionSummary> {
  let mut seen = HashSet::new();
  messages
    .iter()
    .filter(|m| seen.insert(m.session_id.as_str()))
    .map(|m| SessionSummary {
      session_id:   m.session_id.clone(),
      title:        m.session_title.clone(),
      last_message: truncate_chars(&m.content, SUMMARY_PREVIEW_CHARS).to_string(),
      timestamp:    m.timestamp,
      model_used:   m.model_used.clone(),
      request_type: m.request_type,
    })
    .collect()
}
