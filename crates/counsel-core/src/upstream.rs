//! Traits for the external services the relay calls out to: the completion
//! API, the knowledge base, and the object store.
//!
//! These are object-safe (`async-trait`) so the orchestrator can hold a
//! runtime-selected set of providers behind `Arc<dyn _>`.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::upload::Attachment;

/// Failure talking to an external service.
#[derive(Debug, Error)]
pub enum UpstreamError {
  #[error("request failed: {0}")]
  Transport(String),

  #[error("upstream returned {status}: {body}")]
  Status { status: u16, body: String },

  #[error("unexpected response: {0}")]
  Decode(String),

  #[error("not configured: {0}")]
  NotConfigured(String),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

// ─── Completion ──────────────────────────────────────────────────────────────

/// One prompt plus optional inline attachments.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
  /// Provider-specific model name (already resolved from the short id).
  pub model:       String,
  pub prompt:      String,
  pub attachments: Vec<Attachment>,
  pub max_tokens:  u32,
}

#[async_trait]
pub trait CompletionModel: Send + Sync {
  /// Short provider name used in logs.
  fn provider(&self) -> &'static str;

  /// Send the prompt and return the model's text reply.
  async fn complete(&self, request: &CompletionRequest) -> Result<String, UpstreamError>;
}

// ─── Retrieval ───────────────────────────────────────────────────────────────

/// Context passages and their citations for one query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Retrieved {
  pub context: String,
  pub sources: Vec<String>,
}

#[async_trait]
pub trait KnowledgeBase: Send + Sync {
  async fn retrieve(&self, query: &str) -> Result<Retrieved, UpstreamError>;
}

/// Stand-in used when no knowledge base is configured: always empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoKnowledgeBase;

#[async_trait]
impl KnowledgeBase for NoKnowledgeBase {
  async fn retrieve(&self, _query: &str) -> Result<Retrieved, UpstreamError> {
    Ok(Retrieved::default())
  }
}

// ─── Object storage ──────────────────────────────────────────────────────────

#[async_trait]
pub trait ObjectStore: Send + Sync {
  /// Store `body` under `key` and return a URL the client can fetch it from.
  async fn put(
    &self,
    key: &str,
    body: Bytes,
    content_type: &str,
  ) -> Result<String, UpstreamError>;
}
