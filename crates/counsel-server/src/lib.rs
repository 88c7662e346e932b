//! HTTP layer for the Counsel legal chat relay.
//!
//! Exposes an axum [`Router`] over a [`ChatService`] and an
//! [`IdentityGateway`] sharing one [`Store`].

pub mod artifacts;
pub mod auth;
pub mod chat;
pub mod error;
pub mod handlers;
pub mod identity;

pub use error::ApiError;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use counsel_core::{
  artifact::DeliveryMode,
  persona::PersonaSource,
  prompt::HistoryWindow,
  store::{AccountStore, ChatStore},
};
use counsel_upstream::{
  AnthropicConfig, HttpObjectStoreConfig, KnowledgeBaseConfig, ModelSpec, OpenAiConfig,
};
use serde::Deserialize;
use tower_http::{services::ServeDir, trace::TraceLayer};

use auth::{TokenConfig, TokenKeys};
use chat::ChatService;
use identity::IdentityGateway;

/// Largest accepted multipart body for `/api/chat/upload`.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Storage the server needs: chat history plus the user directory.
pub trait Store: ChatStore + AccountStore + Send + Sync + 'static {}

impl<T> Store for T where T: ChatStore + AccountStore + Send + Sync + 'static {}

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `COUNSEL__*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:            String,
  #[serde(default = "default_port")]
  pub port:            u16,
  /// Externally visible origin, used for `/files` URLs.
  #[serde(default = "default_public_base_url")]
  pub public_base_url: String,
  #[serde(default = "default_store_path")]
  pub store_path:      PathBuf,
  /// Where uploads are parked for the duration of one request.
  #[serde(default = "default_upload_dir")]
  pub upload_dir:      PathBuf,
  pub auth:            TokenConfig,
  #[serde(default)]
  pub models:          ModelsConfig,
  #[serde(default)]
  pub anthropic:       Option<AnthropicConfig>,
  #[serde(default)]
  pub openai:          Option<OpenAiConfig>,
  #[serde(default)]
  pub knowledge_base:  Option<KnowledgeBaseConfig>,
  #[serde(default)]
  pub personas:        PersonaSource,
  #[serde(default)]
  pub artifacts:       ArtifactsConfig,
  #[serde(default)]
  pub history:         HistoryConfig,
  #[serde(default = "default_max_tokens")]
  pub max_tokens:      u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelsConfig {
  /// Replaces the built-in model table when non-empty.
  #[serde(default)]
  pub available:  Vec<ModelSpec>,
  #[serde(default)]
  pub default_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
  #[serde(default)]
  pub mode:                 DeliveryMode,
  /// Replies longer than this get a PDF whatever their request type.
  /// `0` disables the rule.
  #[serde(default = "default_long_reply_threshold")]
  pub long_reply_threshold: usize,
  /// Local object store root, served at `/files` when no `http` store is set.
  #[serde(default = "default_files_dir")]
  pub files_dir:            PathBuf,
  #[serde(default)]
  pub http:                 Option<HttpObjectStoreConfig>,
}

impl Default for ArtifactsConfig {
  fn default() -> Self {
    Self {
      mode:                 DeliveryMode::default(),
      long_reply_threshold: default_long_reply_threshold(),
      files_dir:            default_files_dir(),
      http:                 None,
    }
  }
}

impl ArtifactsConfig {
  pub fn threshold(&self) -> Option<usize> {
    (self.long_reply_threshold > 0).then_some(self.long_reply_threshold)
  }

  /// Directory to serve at `/files`, if artifacts are written locally.
  pub fn served_dir(&self) -> Option<&Path> {
    let local = self.mode == DeliveryMode::Upload && self.http.is_none();
    local.then_some(self.files_dir.as_path())
  }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct HistoryConfig {
  #[serde(default = "default_history_turns")]
  pub turns:          usize,
  #[serde(default = "default_history_chars")]
  pub chars_per_turn: usize,
}

impl Default for HistoryConfig {
  fn default() -> Self {
    Self { turns: default_history_turns(), chars_per_turn: default_history_chars() }
  }
}

impl From<HistoryConfig> for HistoryWindow {
  fn from(c: HistoryConfig) -> Self {
    HistoryWindow { turns: c.turns, chars_per_turn: c.chars_per_turn }
  }
}

fn default_host() -> String { "0.0.0.0".into() }

fn default_port() -> u16 { 5000 }

fn default_public_base_url() -> String { "http://localhost:5000".into() }

fn default_store_path() -> PathBuf { PathBuf::from("counsel.db") }

fn default_upload_dir() -> PathBuf { std::env::temp_dir().join("counsel-uploads") }

fn default_max_tokens() -> u32 { chat::DEFAULT_MAX_TOKENS }

fn default_long_reply_threshold() -> usize { 2500 }

fn default_files_dir() -> PathBuf { PathBuf::from("artifacts") }

fn default_history_turns() -> usize { HistoryWindow::default().turns }

fn default_history_chars() -> usize { HistoryWindow::default().chars_per_turn }

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub chat:       Arc<ChatService<S>>,
  pub identity:   Arc<IdentityGateway<S>>,
  pub tokens:     Arc<TokenKeys>,
  pub upload_dir: Arc<PathBuf>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      chat:       self.chat.clone(),
      identity:   self.identity.clone(),
      tokens:     self.tokens.clone(),
      upload_dir: self.upload_dir.clone(),
    }
  }
}

impl<S: Store> AppState<S> {
  pub fn new(
    chat: ChatService<S>,
    identity: IdentityGateway<S>,
    tokens: Arc<TokenKeys>,
    upload_dir: PathBuf,
  ) -> Self {
    Self {
      chat: Arc::new(chat),
      identity: Arc::new(identity),
      tokens,
      upload_dir: Arc::new(upload_dir),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the full application router. `files_dir`, when set, is served
/// read-only at `/files`.
pub fn router<S: Store>(state: AppState<S>, files_dir: Option<&Path>) -> Router {
  use handlers::{auth, chat, models};

  let app = Router::new()
    // Identity
    .route("/api/auth/signup", post(auth::signup::<S>))
    .route("/api/auth/signin", post(auth::signin::<S>))
    .route("/api/auth/verify", post(auth::verify::<S>))
    .route("/api/auth/resend", post(auth::resend::<S>))
    .route("/api/auth/forgot", post(auth::forgot::<S>))
    .route("/api/auth/reset", post(auth::reset::<S>))
    // Models
    .route("/api/models", get(models::list::<S>))
    // Chat
    .route("/api/chat", post(chat::send::<S>))
    .route(
      "/api/chat/upload",
      post(chat::upload::<S>).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
    )
    .route("/api/chat/history", get(chat::history::<S>))
    .route("/api/chat/session/{session_id}", get(chat::session::<S>))
    .with_state(state);

  let app = match files_dir {
    Some(dir) => app.nest_service("/files", ServeDir::new(dir)),
    None => app,
  };
  app.layer(TraceLayer::new_for_http())
}
