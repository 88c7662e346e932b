//! Handlers for `/api/chat*`. All require a bearer access token.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/api/chat` | JSON body |
//! | `POST` | `/api/chat/upload` | multipart: the JSON fields plus any number of `files` |
//! | `GET`  | `/api/chat/history` | session summaries, newest first |
//! | `GET`  | `/api/chat/session/{session_id}` | messages, oldest first |

use std::path::Path as FsPath;

use axum::{
  Json,
  extract::{Multipart, Path, State, multipart::Field},
};
use counsel_core::{
  message::{Message, SessionSummary},
  upload::{UploadGuard, UploadedFile},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Success;
use crate::{
  AppState, Store,
  auth::AuthUser,
  chat::{ChatReply, SendMessage},
  error::ApiError,
};

// ─── Send ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ChatBody {
  pub message:           String,
  #[serde(default)]
  pub session_id:        Option<String>,
  #[serde(default)]
  pub model:             Option<String>,
  #[serde(default)]
  pub user_instructions: Option<String>,
  #[serde(default)]
  pub prompt_type:       Option<String>,
}

impl ChatBody {
  fn into_request(
    self,
    user: &AuthUser,
    files: Vec<UploadedFile>,
  ) -> Result<SendMessage, ApiError> {
    if self.message.trim().is_empty() {
      return Err(ApiError::BadRequest("Message is required".into()));
    }
    Ok(SendMessage {
      user_id: user.user_id().to_string(),
      message: self.message,
      session_id: self.session_id,
      model: self.model,
      user_instructions: self.user_instructions,
      prompt_type: self.prompt_type,
      files,
    })
  }
}

/// `POST /api/chat`
pub async fn send<S: Store>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  Json(body): Json<ChatBody>,
) -> Result<Success<ChatReply>, ApiError> {
  let request = body.into_request(&user, Vec::new())?;
  Ok(Success::new(state.chat.send_message(request).await?))
}

/// `POST /api/chat/upload`
pub async fn upload<S: Store>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  multipart: Multipart,
) -> Result<Success<ChatReply>, ApiError> {
  let mut files = Vec::new();
  let read = read_multipart(multipart, &state.upload_dir, &mut files).await;
  let _uploads = UploadGuard::new(&files);

  let request = read?.into_request(&user, files)?;
  Ok(Success::new(state.chat.send_message(request).await?))
}

/// Collect the text fields into a [`ChatBody`] and park every `files` part
/// on disk. Files written before an error are still pushed to `files`.
async fn read_multipart(
  mut multipart: Multipart,
  dir: &FsPath,
  files: &mut Vec<UploadedFile>,
) -> Result<ChatBody, ApiError> {
  let mut body = ChatBody::default();

  while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
    let name = field.name().unwrap_or_default().to_string();
    match name.as_str() {
      "files" | "file" => {
        if let Some(file) = save_upload(field, dir).await? {
          files.push(file);
        }
      }
      "message" => body.message = text(field).await?,
      "session_id" => body.session_id = Some(text(field).await?),
      "model" => body.model = Some(text(field).await?),
      "user_instructions" => body.user_instructions = Some(text(field).await?),
      "prompt_type" => body.prompt_type = Some(text(field).await?),
      other => tracing::debug!(field = other, "ignoring unknown multipart field"),
    }
  }
  Ok(body)
}

async fn text(field: Field<'_>) -> Result<String, ApiError> {
  field.text().await.map_err(bad_multipart)
}

async fn save_upload(field: Field<'_>, dir: &FsPath) -> Result<Option<UploadedFile>, ApiError> {
  let Some(filename) = field.file_name().and_then(safe_file_name) else {
    return Ok(None);
  };
  let declared = field.content_type().map(str::to_owned);
  let data = field.bytes().await.map_err(bad_multipart)?;

  tokio::fs::create_dir_all(dir).await.map_err(io_error)?;
  let path = dir.join(format!("{}_{filename}", Uuid::new_v4()));
  tokio::fs::write(&path, &data).await.map_err(io_error)?;
  tracing::debug!(file = %filename, bytes = data.len(), "stored upload");

  let mut file = UploadedFile::new(filename, path);
  // Fall back to the client's declared type only when the extension is unknown.
  if file.content_type == "application/octet-stream"
    && let Some(ct) = declared.filter(|ct| !ct.is_empty())
  {
    file.content_type = ct;
  }
  Ok(Some(file))
}

/// The last path component of a client-supplied name, if it has one.
fn safe_file_name(raw: &str) -> Option<String> {
  FsPath::new(raw.trim())
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .filter(|n| !n.is_empty())
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> ApiError {
  ApiError::BadRequest(format!("invalid multipart body: {e}"))
}

fn io_error(e: std::io::Error) -> ApiError { ApiError::Store(Box::new(e)) }

// ─── History ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SessionList {
  pub sessions: Vec<SessionSummary>,
}

/// `GET /api/chat/history`
pub async fn history<S: Store>(
  State(state): State<AppState<S>>,
  user: AuthUser,
) -> Result<Success<SessionList>, ApiError> {
  let sessions = state.chat.get_user_sessions(user.user_id()).await?;
  Ok(Success::new(SessionList { sessions }))
}

#[derive(Debug, Serialize)]
pub struct MessageList {
  pub messages: Vec<Message>,
}

/// `GET /api/chat/session/{session_id}`
pub async fn session<S: Store>(
  State(state): State<AppState<S>>,
  user: AuthUser,
  Path(session_id): Path<String>,
) -> Result<Success<MessageList>, ApiError> {
  let messages = state.chat.get_session_messages(user.user_id(), &session_id).await?;
  Ok(Success::new(MessageList { messages }))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn file_names_lose_directories() {
    assert_eq!(safe_file_name("../../etc/passwd").as_deref(), Some("passwd"));
    assert_eq!(safe_file_name("C:lease.pdf").as_deref(), Some("C:lease.pdf"));
    assert_eq!(safe_file_name("brief.pdf").as_deref(), Some("brief.pdf"));
    assert_eq!(safe_file_name(".."), None);
    assert_eq!(safe_file_name(""), None);
  }
}
