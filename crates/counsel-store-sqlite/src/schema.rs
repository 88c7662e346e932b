//! SQL schema for the Counsel SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Chat messages are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS messages (
    seq               INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id           TEXT NOT NULL,
    message_timestamp TEXT NOT NULL,   -- RFC 3339 UTC
    session_id        TEXT NOT NULL,
    message_type      TEXT NOT NULL,   -- 'user' | 'assistant'
    message_content   TEXT NOT NULL,
    session_title     TEXT NOT NULL,
    model_used        TEXT NOT NULL,
    request_type      TEXT NOT NULL,
    sources           TEXT,            -- JSON array; assistant rows only
    user_instructions TEXT             -- user rows only
);

CREATE INDEX IF NOT EXISTS messages_user_idx
    ON messages(user_id, message_timestamp);
CREATE INDEX IF NOT EXISTS messages_session_idx
    ON messages(user_id, session_id, message_timestamp);

CREATE TABLE IF NOT EXISTS accounts (
    user_id       TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,
    name          TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    verified      INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL
);

-- At most one pending code per email and purpose.
CREATE TABLE IF NOT EXISTS pending_codes (
    email      TEXT NOT NULL,
    purpose    TEXT NOT NULL,   -- 'verify_email' | 'reset_password'
    code_hash  TEXT NOT NULL,   -- SHA-256 hex
    expires_at TEXT NOT NULL,
    attempts   INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (email, purpose)
);

PRAGMA user_version = 1;
";
