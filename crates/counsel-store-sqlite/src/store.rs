//! [`SqliteStore`]: the SQLite implementation of [`ChatStore`] and
//! [`AccountStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use counsel_core::{
  account::{Account, CodePurpose, NewAccount, PendingCode},
  message::Message,
  store::{AccountStore, ChatStore},
};

use crate::{
  encode::{encode_dt, EncodedMessage, RawAccount, RawCode, RawMessage, MESSAGE_COLUMNS},
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Chat history and user directory backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a message query with `?1` (and optionally `?2`) bound.
  async fn query_messages(&self, sql: String, params: Vec<String>) -> Result<Vec<Message>> {
    let raws: Vec<RawMessage> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), RawMessage::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMessage::into_message).collect()
  }

  /// Fail with [`Error::AccountNotFound`] when an update touched no row.
  fn ensure_changed(changed: usize, email: &str) -> Result<()> {
    if changed == 0 {
      return Err(Error::AccountNotFound(email.to_owned()));
    }
    Ok(())
  }
}

// ─── ChatStore impl ──────────────────────────────────────────────────────────

impl ChatStore for SqliteStore {
  type Error = Error;

  async fn append_message(&self, message: Message) -> Result<()> {
    let row = EncodedMessage::from_message(message)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO messages (
             user_id, message_timestamp, session_id, message_type,
             message_content, session_title, model_used, request_type,
             sources, user_instructions
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          rusqlite::params![
            row.user_id,
            row.timestamp,
            row.session_id,
            row.role,
            row.content,
            row.session_title,
            row.model_used,
            row.request_type,
            row.sources,
            row.user_instructions,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(())
  }

  async fn user_messages(&self, user_id: &str) -> Result<Vec<Message>> {
    let sql = format!(
      "SELECT {MESSAGE_COLUMNS} FROM messages
       WHERE user_id = ?1
       ORDER BY message_timestamp DESC, seq DESC"
    );
    self.query_messages(sql, vec![user_id.to_owned()]).await
  }

  async fn session_messages(&self, user_id: &str, session_id: &str) -> Result<Vec<Message>> {
    let sql = format!(
      "SELECT {MESSAGE_COLUMNS} FROM messages
       WHERE user_id = ?1 AND session_id = ?2
       ORDER BY message_timestamp ASC, seq ASC"
    );
    self
      .query_messages(sql, vec![user_id.to_owned(), session_id.to_owned()])
      .await
  }
}

// ─── AccountStore impl ───────────────────────────────────────────────────────

impl AccountStore for SqliteStore {
  type Error = Error;

  async fn create_account(&self, input: NewAccount) -> Result<Option<Account>> {
    let account = Account {
      user_id:       Uuid::new_v4(),
      email:         input.email,
      name:          input.name,
      password_hash: input.password_hash,
      verified:      false,
      created_at:    Utc::now(),
    };

    let id_str = account.user_id.to_string();
    let email  = account.email.clone();
    let name   = account.name.clone();
    let hash   = account.password_hash.clone();
    let at_str = encode_dt(account.created_at);

    let inserted: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let taken = tx
          .query_row(
            "SELECT 1 FROM accounts WHERE email = ?1",
            rusqlite::params![email],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Ok(false);
        }
        tx.execute(
          "INSERT INTO accounts (user_id, email, name, password_hash, verified, created_at)
           VALUES (?1, ?2, ?3, ?4, 0, ?5)",
          rusqlite::params![id_str, email, name, hash, at_str],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(inserted.then_some(account))
  }

  async fn account_by_email(&self, email: &str) -> Result<Option<Account>> {
    let email = email.to_owned();

    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT user_id, email, name, password_hash, verified, created_at
             FROM accounts WHERE email = ?1",
            rusqlite::params![email],
            RawAccount::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawAccount::into_account).transpose()
  }

  async fn mark_verified(&self, email: &str) -> Result<()> {
    let email_owned = email.to_owned();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE accounts SET verified = 1 WHERE email = ?1",
          rusqlite::params![email_owned],
        )?)
      })
      .await?;

    Self::ensure_changed(changed, email)
  }

  async fn set_password_hash(&self, email: &str, password_hash: String) -> Result<()> {
    let email_owned = email.to_owned();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE accounts SET password_hash = ?2 WHERE email = ?1",
          rusqlite::params![email_owned, password_hash],
        )?)
      })
      .await?;

    Self::ensure_changed(changed, email)
  }

  // ── One-time codes ────────────────────────────────────────────────────────

  async fn put_code(&self, code: PendingCode) -> Result<()> {
    let email      = code.email;
    let purpose    = code.purpose.to_string();
    let code_hash  = code.code_hash;
    let expires_at = encode_dt(code.expires_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO pending_codes (email, purpose, code_hash, expires_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (email, purpose)
           DO UPDATE SET code_hash = excluded.code_hash,
                         expires_at = excluded.expires_at,
                         attempts = 0",
          rusqlite::params![email, purpose, code_hash, expires_at],
        )?;
        Ok(())
      })
      .await?;

    Ok(())
  }

  async fn pending_code(&self, email: &str, purpose: CodePurpose) -> Result<Option<PendingCode>> {
    let email   = email.to_owned();
    let purpose = purpose.to_string();

    let raw: Option<RawCode> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT email, purpose, code_hash, expires_at, attempts
             FROM pending_codes WHERE email = ?1 AND purpose = ?2",
            rusqlite::params![email, purpose],
            |row| {
              Ok(RawCode {
                email:      row.get(0)?,
                purpose:    row.get(1)?,
                code_hash:  row.get(2)?,
                expires_at: row.get(3)?,
                attempts:   row.get(4)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawCode::into_code).transpose()
  }

  async fn record_failed_attempt(&self, email: &str, purpose: CodePurpose) -> Result<u32> {
    let email   = email.to_owned();
    let purpose = purpose.to_string();

    let attempts: Option<i64> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "UPDATE pending_codes SET attempts = attempts + 1
             WHERE email = ?1 AND purpose = ?2
             RETURNING attempts",
            rusqlite::params![email, purpose],
            |row| row.get(0),
          )
          .optional()?)
      })
      .await?;

    Ok(attempts.map_or(0, |n| u32::try_from(n).unwrap_or(u32::MAX)))
  }

  async fn clear_code(&self, email: &str, purpose: CodePurpose) -> Result<()> {
    let email   = email.to_owned();
    let purpose = purpose.to_string();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM pending_codes WHERE email = ?1 AND purpose = ?2",
          rusqlite::params![email, purpose],
        )?;
        Ok(())
      })
      .await?;

    Ok(())
  }
}
