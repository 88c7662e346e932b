//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure body has the shape `{"success": false, "error": "..."}`.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{chat::ChatError, identity::IdentityError};

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("Unauthorized")]
  Unauthorized,

  #[error("{0}")]
  BadRequest(String),

  #[error(transparent)]
  Identity(#[from] IdentityError),

  #[error(transparent)]
  Chat(#[from] ChatError),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Identity(e) => e.status(),
      ApiError::Chat(_) | ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    (status, Json(json!({ "success": false, "error": self.to_string() }))).into_response()
  }
}
