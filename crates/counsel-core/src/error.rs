//! Error types for `counsel-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown request type: {0:?}")]
  UnknownRequestType(String),

  #[error("unknown message role: {0:?}")]
  UnknownRole(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
