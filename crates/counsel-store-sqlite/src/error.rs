//! Error type for `counsel-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] counsel_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown code purpose: {0:?}")]
  UnknownCodePurpose(String),

  #[error("account not found: {0}")]
  AccountNotFound(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
