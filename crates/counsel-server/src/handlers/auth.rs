//! Handlers for `/api/auth/*`.
//!
//! | Method | Path | Body |
//! |--------|------|------|
//! | `POST` | `/api/auth/signup` | `{email, password, name}` |
//! | `POST` | `/api/auth/signin` | `{email, password}` |
//! | `POST` | `/api/auth/verify` | `{email, code}` |
//! | `POST` | `/api/auth/resend` | `{email}` |
//! | `POST` | `/api/auth/forgot` | `{email}` |
//! | `POST` | `/api/auth/reset` | `{email, code, new_password}` |

use axum::{Json, extract::State};
use serde::Deserialize;

use super::Success;
use crate::{
  AppState, Store,
  auth::TokenPair,
  error::ApiError,
  identity::Ack,
};

type AckResult = Result<Success<Ack>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct SignupBody {
  pub email:    String,
  pub password: String,
  pub name:     String,
}

pub async fn signup<S: Store>(
  State(state): State<AppState<S>>,
  Json(body): Json<SignupBody>,
) -> AckResult {
  let ack = state.identity.signup(&body.email, &body.password, &body.name).await?;
  Ok(Success::new(ack))
}

#[derive(Debug, Deserialize)]
pub struct SigninBody {
  pub email:    String,
  pub password: String,
}

pub async fn signin<S: Store>(
  State(state): State<AppState<S>>,
  Json(body): Json<SigninBody>,
) -> Result<Success<TokenPair>, ApiError> {
  let tokens = state.identity.signin(&body.email, &body.password).await?;
  Ok(Success::new(tokens))
}

#[derive(Debug, Deserialize)]
pub struct CodeBody {
  pub email: String,
  pub code:  String,
}

pub async fn verify<S: Store>(
  State(state): State<AppState<S>>,
  Json(body): Json<CodeBody>,
) -> AckResult {
  Ok(Success::new(state.identity.verify_email(&body.email, &body.code).await?))
}

#[derive(Debug, Deserialize)]
pub struct EmailBody {
  pub email: String,
}

pub async fn resend<S: Store>(
  State(state): State<AppState<S>>,
  Json(body): Json<EmailBody>,
) -> AckResult {
  Ok(Success::new(state.identity.resend_verification(&body.email).await?))
}

pub async fn forgot<S: Store>(
  State(state): State<AppState<S>>,
  Json(body): Json<EmailBody>,
) -> AckResult {
  Ok(Success::new(state.identity.forgot_password(&body.email).await?))
}

#[derive(Debug, Deserialize)]
pub struct ResetBody {
  pub email:        String,
  pub code:         String,
  pub new_password: String,
}

pub async fn reset<S: Store>(
  State(state): State<AppState<S>>,
  Json(body): Json<ResetBody>,
) -> AckResult {
  let ack = state
    .identity
    .reset_password(&body.email, &body.code, &body.new_password)
    .await?;
  Ok(Success::new(ack))
}
