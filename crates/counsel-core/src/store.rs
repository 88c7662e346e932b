//! Persistence traits.
//!
//! Implemented by storage backends (e.g. `counsel-store-sqlite`). The chat
//! orchestrator and the identity gateway depend on these abstractions, not on
//! any concrete backend.

use std::future::Future;

use crate::{
  account::{Account, CodePurpose, NewAccount, PendingCode},
  message::Message,
};

// ─── Chat history ────────────────────────────────────────────────────────────

/// Append-only store of chat messages keyed by user and session.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ChatStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Append one message. Messages are never updated or deleted.
  fn append_message(
    &self,
    message: Message,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// All messages of a user, newest first.
  fn user_messages<'a>(
    &'a self,
    user_id: &'a str,
  ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send + 'a;

  /// Messages of one session, oldest first.
  fn session_messages<'a>(
    &'a self,
    user_id: &'a str,
    session_id: &'a str,
  ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send + 'a;
}

// ─── Accounts ────────────────────────────────────────────────────────────────

/// User directory backing the identity gateway.
pub trait AccountStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create an unverified account. Returns `None` when the email is already
  /// registered; the check and the insert are atomic.
  fn create_account(
    &self,
    input: NewAccount,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  /// Look up an account by (normalised) email. Returns `None` if not found.
  fn account_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + 'a;

  fn mark_verified<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn set_password_hash<'a>(
    &'a self,
    email: &'a str,
    password_hash: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Store a code, replacing any pending code for the same email and purpose
  /// and resetting its attempt count.
  fn put_code(
    &self,
    code: PendingCode,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// The pending code for `email` and `purpose`, if any.
  fn pending_code<'a>(
    &'a self,
    email: &'a str,
    purpose: CodePurpose,
  ) -> impl Future<Output = Result<Option<PendingCode>, Self::Error>> + Send + 'a;

  /// Count one wrong guess against the pending code and return the new
  /// total. Returns `0` when no code is pending.
  fn record_failed_attempt<'a>(
    &'a self,
    email: &'a str,
    purpose: CodePurpose,
  ) -> impl Future<Output = Result<u32, Self::Error>> + Send + 'a;

  /// Discard the pending code for `email` and `purpose` once it is redeemed or exhausted.
  fn clear_code<'a>(
    &'a self,
    email: &'a str,
    purpose: CodePurpose,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
