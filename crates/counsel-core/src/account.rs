//! User accounts held by the identity gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// A registered user. Passwords only ever exist as argon2 PHC strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
  pub user_id:       Uuid,
  pub email:         String,
  pub name:          String,
  pub password_hash: String,
  pub verified:      bool,
  pub created_at:    DateTime<Utc>,
}

/// Input to [`AccountStore::create_account`](crate::store::AccountStore::create_account).
#[derive(Debug, Clone)]
pub struct NewAccount {
  pub email:         String,
  pub name:          String,
  pub password_hash: String,
}

/// What a one-time code authorises.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CodePurpose {
  VerifyEmail,
  ResetPassword,
}

/// A pending one-time code. Only the SHA-256 digest of the code is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCode {
  pub email:      String,
  pub purpose:    CodePurpose,
  pub code_hash:  String,
  pub expires_at: DateTime<Utc>,
  /// Wrong guesses made against this code so far.
  pub attempts:   u32,
}

/// Normalise an email address for lookups.
pub fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }
