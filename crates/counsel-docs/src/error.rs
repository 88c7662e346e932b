//! Error type for `counsel-docs`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("pdf rendering failed: {0}")]
  Pdf(String),

  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("csv buffer error: {0}")]
  CsvBuffer(String),

  #[error("{0}")]
  Extraction(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
