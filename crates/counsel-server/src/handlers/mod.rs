//! Route handlers. Every success body is a JSON object carrying
//! `"success": true` next to the payload fields.

pub mod auth;
pub mod chat;
pub mod models;

use axum::{
  Json,
  response::{IntoResponse, Response},
};
use serde::Serialize;

/// Wraps a payload struct as `{"success": true, ...fields}`.
#[derive(Debug, Serialize)]
pub struct Success<T> {
  success: bool,
  #[serde(flatten)]
  body:    T,
}

impl<T: Serialize> Success<T> {
  pub fn new(body: T) -> Self { Self { success: true, body } }
}

impl<T: Serialize> IntoResponse for Success<T> {
  fn into_response(self) -> Response { Json(self).into_response() }
}
