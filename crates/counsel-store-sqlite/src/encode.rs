//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, tag enums by their snake_case
//! names, and source lists as compact JSON arrays.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use counsel_core::{
  account::{Account, CodePurpose, PendingCode},
  classify::RequestType,
  message::{Message, Role},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Tags ────────────────────────────────────────────────────────────────────

pub fn decode_role(s: &str) -> Result<Role> {
  Role::from_str(s).map_err(|_| counsel_core::Error::UnknownRole(s.to_owned()).into())
}

pub fn decode_request_type(s: &str) -> Result<RequestType> {
  RequestType::from_str(s)
    .map_err(|_| counsel_core::Error::UnknownRequestType(s.to_owned()).into())
}

pub fn decode_purpose(s: &str) -> Result<CodePurpose> {
  CodePurpose::from_str(s)
    .map_err(|_| Error::UnknownCodePurpose(s.to_owned()))
}

// ─── Sources ─────────────────────────────────────────────────────────────────

pub fn encode_sources(sources: Option<&[String]>) -> Result<Option<String>> {
  sources.map(serde_json::to_string).transpose().map_err(Error::from)
}

pub fn decode_sources(s: Option<&str>) -> Result<Option<Vec<String>>> {
  s.map(serde_json::from_str).transpose().map_err(Error::from)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column values for one `messages` row, in insert order.
pub struct EncodedMessage {
  pub user_id:           String,
  pub timestamp:         String,
  pub session_id:        String,
  pub role:              String,
  pub content:           String,
  pub session_title:     String,
  pub model_used:        String,
  pub request_type:      String,
  pub sources:           Option<String>,
  pub user_instructions: Option<String>,
}

impl EncodedMessage {
  pub fn from_message(m: Message) -> Result<Self> {
    Ok(Self {
      sources:           encode_sources(m.sources.as_deref())?,
      user_id:           m.user_id,
      timestamp:         encode_dt(m.timestamp),
      session_id:        m.session_id,
      role:              m.role.to_string(),
      content:           m.content,
      session_title:     m.session_title,
      model_used:        m.model_used,
      request_type:      m.request_type.to_string(),
      user_instructions: m.user_instructions,
    })
  }
}

/// Raw strings read directly from a `messages` row.
pub struct RawMessage {
  pub user_id:           String,
  pub timestamp:         String,
  pub session_id:        String,
  pub role:              String,
  pub content:           String,
  pub session_title:     String,
  pub model_used:        String,
  pub request_type:      String,
  pub sources:           Option<String>,
  pub user_instructions: Option<String>,
}

/// Column list matching [`RawMessage::from_row`].
pub const MESSAGE_COLUMNS: &str = "user_id, message_timestamp, session_id, message_type, \
   message_content, session_title, model_used, request_type, sources, user_instructions";

impl RawMessage {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:           row.get(0)?,
      timestamp:         row.get(1)?,
      session_id:        row.get(2)?,
      role:              row.get(3)?,
      content:           row.get(4)?,
      session_title:     row.get(5)?,
      model_used:        row.get(6)?,
      request_type:      row.get(7)?,
      sources:           row.get(8)?,
      user_instructions: row.get(9)?,
    })
  }

  pub fn into_message(self) -> Result<Message> {
    Ok(Message {
      timestamp:         decode_dt(&self.timestamp)?,
      role:              decode_role(&self.role)?,
      request_type:      decode_request_type(&self.request_type)?,
      sources:           decode_sources(self.sources.as_deref())?,
      user_id:           self.user_id,
      session_id:        self.session_id,
      content:           self.content,
      session_title:     self.session_title,
      model_used:        self.model_used,
      user_instructions: self.user_instructions,
    })
  }
}

/// Raw strings read directly from an `accounts` row.
pub struct RawAccount {
  pub user_id:       String,
  pub email:         String,
  pub name:          String,
  pub password_hash: String,
  pub verified:      bool,
  pub created_at:    String,
}

impl RawAccount {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      email:         row.get(1)?,
      name:          row.get(2)?,
      password_hash: row.get(3)?,
      verified:      row.get(4)?,
      created_at:    row.get(5)?,
    })
  }

  pub fn into_account(self) -> Result<Account> {
    Ok(Account {
      user_id:       Uuid::parse_str(&self.user_id)?,
      email:         self.email,
      name:          self.name,
      password_hash: self.password_hash,
      verified:      self.verified,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `pending_codes` row.
pub struct RawCode {
  pub email:      String,
  pub purpose:    String,
  pub code_hash:  String,
  pub expires_at: String,
  pub attempts:   i64,
}

impl RawCode {
  pub fn into_code(self) -> Result<PendingCode> {
    Ok(PendingCode {
      purpose:    decode_purpose(&self.purpose)?,
      expires_at: decode_dt(&self.expires_at)?,
      email:      self.email,
      code_hash:  self.code_hash,
      attempts:   u32::try_from(self.attempts).unwrap_or(u32::MAX),
    })
  }
}
