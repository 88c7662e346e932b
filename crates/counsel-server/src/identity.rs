//! Local identity gateway: sign-up, sign-in, email verification and
//! password reset over an [`AccountStore`].
//!
//! One-time codes are six digits, stored only as SHA-256 hex digests, and
//! handed to a [`Notifier`] for delivery. A code is discarded after
//! [`MAX_CODE_ATTEMPTS`] wrong guesses.

use std::sync::Arc;

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use counsel_core::{
  account::{CodePurpose, NewAccount, PendingCode, normalize_email},
  store::AccountStore,
};
use rand_core::{OsRng, RngCore};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::auth::{TokenError, TokenKeys, TokenPair};

pub const MIN_PASSWORD_CHARS: usize = 8;

/// Wrong guesses allowed against one code before it is discarded.
pub const MAX_CODE_ATTEMPTS: u32 = 5;

const DEFAULT_CODE_TTL_MINUTES: i64 = 15;

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum IdentityError {
  #[error("{0}")]
  InvalidInput(String),

  #[error("An account with this email already exists")]
  EmailTaken,

  #[error("Incorrect email or password")]
  InvalidCredentials,

  #[error("Email address has not been verified")]
  NotVerified,

  #[error("Email address is already verified")]
  AlreadyVerified,

  #[error("No account exists for this email")]
  UnknownAccount,

  #[error("Invalid or expired code")]
  InvalidCode,

  #[error("password hashing failed: {0}")]
  Hash(String),

  #[error(transparent)]
  Token(#[from] TokenError),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl IdentityError {
  pub fn status(&self) -> StatusCode {
    match self {
      Self::InvalidInput(_) | Self::InvalidCode => StatusCode::BAD_REQUEST,
      Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
      Self::NotVerified => StatusCode::FORBIDDEN,
      Self::UnknownAccount => StatusCode::NOT_FOUND,
      Self::EmailTaken | Self::AlreadyVerified => StatusCode::CONFLICT,
      Self::Hash(_) | Self::Token(_) | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

fn store_err<E: std::error::Error + Send + Sync + 'static>(e: E) -> IdentityError {
  IdentityError::Store(Box::new(e))
}

// ─── Code delivery ───────────────────────────────────────────────────────────

/// Delivers one-time codes to the account holder.
#[async_trait]
pub trait Notifier: Send + Sync {
  async fn deliver(&self, email: &str, purpose: CodePurpose, code: &str);
}

/// Writes the delivery event to the log. Suitable for development only: the
/// code itself is logged at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
  async fn deliver(&self, email: &str, purpose: CodePurpose, code: &str) {
    tracing::info!(email, %purpose, "one-time code issued");
    tracing::debug!(email, %purpose, code, "one-time code");
  }
}

// ─── Responses ───────────────────────────────────────────────────────────────

/// Acknowledgement for operations without a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ack {
  pub message: String,
}

impl Ack {
  fn new(message: &str) -> Self { Self { message: message.to_string() } }
}

// ─── Gateway ─────────────────────────────────────────────────────────────────

pub struct IdentityGateway<S> {
  store:    Arc<S>,
  tokens:   Arc<TokenKeys>,
  notifier: Arc<dyn Notifier>,
  code_ttl: Duration,
}

impl<S: AccountStore> IdentityGateway<S> {
  pub fn new(store: Arc<S>, tokens: Arc<TokenKeys>) -> Self {
    Self {
      store,
      tokens,
      notifier: Arc::new(LogNotifier),
      code_ttl: Duration::minutes(DEFAULT_CODE_TTL_MINUTES),
    }
  }

  pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
    self.notifier = notifier;
    self
  }

  pub fn with_code_ttl(mut self, ttl: Duration) -> Self {
    self.code_ttl = ttl;
    self
  }

  /// Register an unverified account and send its verification code.
  pub async fn signup(
    &self,
    email: &str,
    password: &str,
    name: &str,
  ) -> Result<Ack, IdentityError> {
    let email = checked_email(email)?;
    check_password(password)?;
    let name = name.trim();
    if name.is_empty() {
      return Err(IdentityError::InvalidInput("Name is required".into()));
    }

    if self.store.account_by_email(&email).await.map_err(store_err)?.is_some() {
      return Err(IdentityError::EmailTaken);
    }

    let account = self
      .store
      .create_account(NewAccount {
        email:         email.clone(),
        name:          name.to_string(),
        password_hash: hash_password(password)?,
      })
      .await
      .map_err(store_err)?
      .ok_or(IdentityError::EmailTaken)?;
    tracing::info!(user_id = %account.user_id, "account created");

    self.issue_code(&email, CodePurpose::VerifyEmail).await?;
    Ok(Ack::new("User created successfully. Check your email for a verification code."))
  }

  /// Exchange credentials for an access and ID token pair.
  pub async fn signin(&self, email: &str, password: &str) -> Result<TokenPair, IdentityError> {
    let email = normalize_email(email);
    let account = self
      .store
      .account_by_email(&email)
      .await
      .map_err(store_err)?
      .ok_or(IdentityError::InvalidCredentials)?;

    if !verify_password(password, &account.password_hash) {
      tracing::debug!(user_id = %account.user_id, "password mismatch");
      return Err(IdentityError::InvalidCredentials);
    }
    if !account.verified {
      return Err(IdentityError::NotVerified);
    }

    Ok(self.tokens.issue_pair(&account)?)
  }

  pub async fn verify_email(&self, email: &str, code: &str) -> Result<Ack, IdentityError> {
    let email = normalize_email(email);
    let account = self
      .store
      .account_by_email(&email)
      .await
      .map_err(store_err)?
      .ok_or(IdentityError::UnknownAccount)?;
    if account.verified {
      return Err(IdentityError::AlreadyVerified);
    }

    self.redeem_code(&email, CodePurpose::VerifyEmail, code).await?;
    self.store.mark_verified(&email).await.map_err(store_err)?;
    tracing::info!(user_id = %account.user_id, "email verified");
    Ok(Ack::new("Email verified successfully"))
  }

  pub async fn resend_verification(&self, email: &str) -> Result<Ack, IdentityError> {
    let email = normalize_email(email);
    let account = self
      .store
      .account_by_email(&email)
      .await
      .map_err(store_err)?
      .ok_or(IdentityError::UnknownAccount)?;
    if account.verified {
      return Err(IdentityError::AlreadyVerified);
    }

    self.issue_code(&email, CodePurpose::VerifyEmail).await?;
    Ok(Ack::new("Verification code sent"))
  }

  /// Start a password reset. Answers the same way whether or not the
  /// account exists.
  pub async fn forgot_password(&self, email: &str) -> Result<Ack, IdentityError> {
    let email = normalize_email(email);
    if self.store.account_by_email(&email).await.map_err(store_err)?.is_some() {
      self.issue_code(&email, CodePurpose::ResetPassword).await?;
    } else {
      tracing::debug!("password reset requested for unknown email");
    }
    Ok(Ack::new("If an account exists for this email, a reset code has been sent"))
  }

  pub async fn reset_password(
    &self,
    email: &str,
    code: &str,
    new_password: &str,
  ) -> Result<Ack, IdentityError> {
    let email = normalize_email(email);
    check_password(new_password)?;

    self.redeem_code(&email, CodePurpose::ResetPassword, code).await?;
    self
      .store
      .set_password_hash(&email, hash_password(new_password)?)
      .await
      .map_err(store_err)?;
    Ok(Ack::new("Password reset successfully"))
  }

  // ─── Codes ─────────────────────────────────────────────────────────────────

  async fn issue_code(&self, email: &str, purpose: CodePurpose) -> Result<(), IdentityError> {
    let code = generate_code();
    self
      .store
      .put_code(PendingCode {
        email: email.to_string(),
        purpose,
        code_hash: digest(&code),
        expires_at: Utc::now() + self.code_ttl,
        attempts: 0,
      })
      .await
      .map_err(store_err)?;

    self.notifier.deliver(email, purpose, &code).await;
    Ok(())
  }

  /// Check `code` against the pending one and consume it on success. Wrong
  /// guesses are counted and the code is dropped once they reach
  /// [`MAX_CODE_ATTEMPTS`].
  async fn redeem_code(
    &self,
    email: &str,
    purpose: CodePurpose,
    code: &str,
  ) -> Result<(), IdentityError> {
    let pending = self
      .store
      .pending_code(email, purpose)
      .await
      .map_err(store_err)?
      .ok_or(IdentityError::InvalidCode)?;

    if pending.expires_at <= Utc::now() || pending.attempts >= MAX_CODE_ATTEMPTS {
      self.store.clear_code(email, purpose).await.map_err(store_err)?;
      return Err(IdentityError::InvalidCode);
    }

    if pending.code_hash != digest(code.trim()) {
      let attempts = self
        .store
        .record_failed_attempt(email, purpose)
        .await
        .map_err(store_err)?;
      if attempts >= MAX_CODE_ATTEMPTS {
        tracing::warn!(email, %purpose, attempts, "too many wrong codes, discarding");
        self.store.clear_code(email, purpose).await.map_err(store_err)?;
      }
      return Err(IdentityError::InvalidCode);
    }

    self.store.clear_code(email, purpose).await.map_err(store_err)
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn checked_email(raw: &str) -> Result<String, IdentityError> {
  let email = normalize_email(raw);
  let valid = email
    .split_once('@')
    .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
  if valid {
    Ok(email)
  } else {
    Err(IdentityError::InvalidInput("A valid email address is required".into()))
  }
}

fn check_password(password: &str) -> Result<(), IdentityError> {
  if password.chars().count() < MIN_PASSWORD_CHARS {
    return Err(IdentityError::InvalidInput(format!(
      "Password must be at least {MIN_PASSWORD_CHARS} characters"
    )));
  }
  Ok(())
}

fn hash_password(password: &str) -> Result<String, IdentityError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| IdentityError::Hash(e.to_string()))
}

fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
    .is_ok()
}

fn generate_code() -> String { format!("{:06}", OsRng.next_u32() % 1_000_000) }

fn digest(code: &str) -> String { hex::encode(Sha256::digest(code.as_bytes())) }
