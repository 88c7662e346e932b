//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{DateTime, Duration, TimeZone as _, Utc};
use counsel_core::{
  account::{CodePurpose, NewAccount, PendingCode},
  classify::RequestType,
  message::{Message, Role},
  store::{AccountStore, ChatStore},
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn at(minute: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2025, 3, 14, 9, minute, 0).unwrap()
}

fn message(user: &str, session: &str, role: Role, content: &str, ts: DateTime<Utc>) -> Message {
  Message {
    user_id:           user.into(),
    timestamp:         ts,
    session_id:        session.into(),
    role,
    content:           content.into(),
    session_title:     "Draft an NDA".into(),
    model_used:        "claude-sonnet-4".into(),
    request_type:      RequestType::Document,
    sources:           None,
    user_instructions: None,
  }
}

// ─── Messages ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn session_messages_are_oldest_first() {
  let s = store().await;
  s.append_message(message("u1", "s1", Role::Assistant, "second", at(2)))
    .await
    .unwrap();
  s.append_message(message("u1", "s1", Role::User, "first", at(1)))
    .await
    .unwrap();

  let got = s.session_messages("u1", "s1").await.unwrap();
  let contents: Vec<_> = got.iter().map(|m| m.content.as_str()).collect();
  assert_eq!(contents, ["first", "second"]);
}

#[tokio::test]
async fn equal_timestamps_keep_insertion_order() {
  let s = store().await;
  s.append_message(message("u1", "s1", Role::User, "question", at(5)))
    .await
    .unwrap();
  s.append_message(message("u1", "s1", Role::Assistant, "answer", at(5)))
    .await
    .unwrap();

  let asc = s.session_messages("u1", "s1").await.unwrap();
  assert_eq!(asc[0].role, Role::User);
  assert_eq!(asc[1].role, Role::Assistant);

  let desc = s.user_messages("u1").await.unwrap();
  assert_eq!(desc[0].role, Role::Assistant);
  assert_eq!(desc[1].role, Role::User);
}

#[tokio::test]
async fn user_messages_are_newest_first_and_scoped_to_user() {
  let s = store().await;
  s.append_message(message("u1", "s1", Role::User, "a", at(1))).await.unwrap();
  s.append_message(message("u1", "s2", Role::User, "b", at(3))).await.unwrap();
  s.append_message(message("u2", "s9", Role::User, "other", at(2)))
    .await
    .unwrap();

  let got = s.user_messages("u1").await.unwrap();
  let contents: Vec<_> = got.iter().map(|m| m.content.as_str()).collect();
  assert_eq!(contents, ["b", "a"]);
}

#[tokio::test]
async fn session_of_another_user_is_empty() {
  let s = store().await;
  s.append_message(message("u1", "s1", Role::User, "mine", at(1)))
    .await
    .unwrap();

  assert!(s.session_messages("u2", "s1").await.unwrap().is_empty());
  assert!(s.session_messages("u1", "missing").await.unwrap().is_empty());
}

#[tokio::test]
async fn optional_fields_round_trip() {
  let s = store().await;

  let mut user = message("u1", "s1", Role::User, "draft", at(1));
  user.user_instructions = Some("Use Virginia law".into());
  let mut reply = message("u1", "s1", Role::Assistant, "done", at(2));
  reply.sources = Some(vec!["s3://kb/va-code.pdf".into(), "s3://kb/nda.pdf".into()]);

  s.append_message(user.clone()).await.unwrap();
  s.append_message(reply.clone()).await.unwrap();

  let got = s.session_messages("u1", "s1").await.unwrap();
  assert_eq!(got, vec![user, reply]);
  assert!(got[0].sources.is_none());
  assert!(got[1].user_instructions.is_none());
}

// ─── Accounts ────────────────────────────────────────────────────────────────

fn new_account(email: &str) -> NewAccount {
  NewAccount {
    email:         email.into(),
    name:          "Ada Counsel".into(),
    password_hash: "$argon2id$placeholder".into(),
  }
}

#[tokio::test]
async fn create_and_fetch_account() {
  let s = store().await;
  let created = s.create_account(new_account("ada@example.com")).await.unwrap().unwrap();
  assert!(!created.verified);

  let fetched = s.account_by_email("ada@example.com").await.unwrap().unwrap();
  assert_eq!(fetched.user_id, created.user_id);
  assert_eq!(fetched.name, "Ada Counsel");
  assert!(!fetched.verified);
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
  let s = store().await;
  s.create_account(new_account("ada@example.com")).await.unwrap();

  let second = s.create_account(new_account("ada@example.com")).await.unwrap();
  assert!(second.is_none());
}

#[tokio::test]
async fn missing_account_is_none() {
  let s = store().await;
  assert!(s.account_by_email("nobody@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn verify_and_change_password() {
  let s = store().await;
  s.create_account(new_account("ada@example.com")).await.unwrap();

  s.mark_verified("ada@example.com").await.unwrap();
  s.set_password_hash("ada@example.com", "$argon2id$new".into())
    .await
    .unwrap();

  let acct = s.account_by_email("ada@example.com").await.unwrap().unwrap();
  assert!(acct.verified);
  assert_eq!(acct.password_hash, "$argon2id$new");
}

#[tokio::test]
async fn updating_unknown_account_fails() {
  let s = store().await;
  let err = s.mark_verified("ghost@example.com").await.unwrap_err();
  assert!(matches!(err, Error::AccountNotFound(_)));
}

// ─── Codes ───────────────────────────────────────────────────────────────────

fn code(hash: &str, purpose: CodePurpose) -> PendingCode {
  PendingCode {
    email: "ada@example.com".into(),
    purpose,
    code_hash: hash.into(),
    expires_at: at(0) + Duration::minutes(15),
    attempts: 0,
  }
}

#[tokio::test]
async fn put_code_replaces_previous_code() {
  let s = store().await;
  s.put_code(code("aaa", CodePurpose::VerifyEmail)).await.unwrap();
  s.put_code(code("bbb", CodePurpose::VerifyEmail)).await.unwrap();

  let got = s
    .pending_code("ada@example.com", CodePurpose::VerifyEmail)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(got.code_hash, "bbb");
  assert_eq!(got.expires_at, at(15));
}

#[tokio::test]
async fn failed_attempts_accumulate_until_code_is_replaced() {
  let s = store().await;
  assert_eq!(
    s.record_failed_attempt("ada@example.com", CodePurpose::ResetPassword).await.unwrap(),
    0
  );

  s.put_code(code("aaa", CodePurpose::ResetPassword)).await.unwrap();
  for expected in 1..=3 {
    let n = s
      .record_failed_attempt("ada@example.com", CodePurpose::ResetPassword)
      .await
      .unwrap();
    assert_eq!(n, expected);
  }
  let got = s
    .pending_code("ada@example.com", CodePurpose::ResetPassword)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(got.attempts, 3);

  s.put_code(code("bbb", CodePurpose::ResetPassword)).await.unwrap();
  let got = s
    .pending_code("ada@example.com", CodePurpose::ResetPassword)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(got.attempts, 0);
}

#[tokio::test]
async fn codes_are_kept_per_purpose() {
  let s = store().await;
  s.put_code(code("verify", CodePurpose::VerifyEmail)).await.unwrap();
  s.put_code(code("reset", CodePurpose::ResetPassword)).await.unwrap();

  s.clear_code("ada@example.com", CodePurpose::VerifyEmail)
    .await
    .unwrap();

  assert!(
    s.pending_code("ada@example.com", CodePurpose::VerifyEmail)
      .await
      .unwrap()
      .is_none()
  );
  let reset = s
    .pending_code("ada@example.com", CodePurpose::ResetPassword)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(reset.code_hash, "reset");
}

#[tokio::test]
async fn reopening_file_store_keeps_data() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("counsel.db");

  {
    let s = SqliteStore::open(&path).await.unwrap();
    s.append_message(message("u1", "s1", Role::User, "persisted", at(1)))
      .await
      .unwrap();
  }

  let s = SqliteStore::open(&path).await.unwrap();
  let got = s.session_messages("u1", "s1").await.unwrap();
  assert_eq!(got.len(), 1);
  assert_eq!(got[0].content, "persisted");
}
