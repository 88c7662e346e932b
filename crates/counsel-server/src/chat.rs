//! The chat orchestrator: one [`ChatService::send_message`] call per
//! incoming message.
//!
//! ```text
//! classify → load history → persist user message → extract uploads
//!   → retrieve → assemble prompt → complete → format
//!   → persist assistant message → maybe artifact
//! ```
//!
//! Uploaded files are removed when the call returns, on every path.

use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use counsel_core::{
  artifact::{ArtifactPolicy, OutputArtifact},
  classify::{RequestType, classify},
  format::format_response,
  message::{
    Message, Role, SessionSummary, generate_session_id, session_title, summarize_sessions,
  },
  persona::{PersonaSource, PromptType},
  prompt::{HistoryWindow, PromptInput, assemble, summarize_history},
  store::ChatStore,
  upload::{Attachment, UploadGuard, UploadedFile},
  upstream::{
    CompletionModel, CompletionRequest, KnowledgeBase, NoKnowledgeBase, Retrieved,
    UpstreamError,
  },
};
use counsel_docs::extract::ExtractionChain;
use counsel_upstream::{ModelInfo, ModelRegistry, ModelSpec, Provider};
use serde::Serialize;
use thiserror::Error;

use crate::artifacts::ArtifactGenerator;

/// Prefix of the visible reply when the completion call fails.
pub const COMPLETION_ERROR_PREFIX: &str = "Error generating response:";

pub const DEFAULT_MAX_TOKENS: u32 = 4000;

#[derive(Debug, Error)]
pub enum ChatError {
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

fn store_err<E: std::error::Error + Send + Sync + 'static>(e: E) -> ChatError {
  ChatError::Store(Box::new(e))
}

// ─── Request / reply ─────────────────────────────────────────────────────────

/// One incoming chat message and everything sent with it.
#[derive(Debug, Clone, Default)]
pub struct SendMessage {
  pub user_id:           String,
  pub message:           String,
  pub session_id:        Option<String>,
  /// Short model id; unknown or missing ids use the default model.
  pub model:             Option<String>,
  pub user_instructions: Option<String>,
  pub prompt_type:       Option<String>,
  pub files:             Vec<UploadedFile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
  pub response:     String,
  pub session_id:   String,
  pub model_used:   String,
  pub sources:      Vec<String>,
  pub request_type: RequestType,
  pub output_files: Vec<OutputArtifact>,
}

// ─── Service ─────────────────────────────────────────────────────────────────

pub struct ChatService<S> {
  store:       Arc<S>,
  models:      ModelRegistry,
  completions: HashMap<Provider, Arc<dyn CompletionModel>>,
  knowledge:   Arc<dyn KnowledgeBase>,
  personas:    PersonaSource,
  extraction:  Arc<ExtractionChain>,
  artifacts:   ArtifactGenerator,
  history:     HistoryWindow,
  max_tokens:  u32,
}

impl<S: ChatStore> ChatService<S> {
  /// A service with the default model table, no knowledge base, built-in
  /// personas and inline artifacts. Providers are added with
  /// [`with_completion`](Self::with_completion).
  pub fn new(store: Arc<S>) -> Self {
    Self {
      store,
      models: ModelRegistry::default(),
      completions: HashMap::new(),
      knowledge: Arc::new(NoKnowledgeBase),
      personas: PersonaSource::default(),
      extraction: Arc::new(ExtractionChain::default()),
      artifacts: ArtifactGenerator::inline(ArtifactPolicy::default()),
      history: HistoryWindow::default(),
      max_tokens: DEFAULT_MAX_TOKENS,
    }
  }

  pub fn with_models(mut self, models: ModelRegistry) -> Self {
    self.models = models;
    self
  }

  pub fn with_completion(mut self, provider: Provider, client: Arc<dyn CompletionModel>) -> Self {
    self.completions.insert(provider, client);
    self
  }

  pub fn with_knowledge_base(mut self, knowledge: Arc<dyn KnowledgeBase>) -> Self {
    self.knowledge = knowledge;
    self
  }

  pub fn with_personas(mut self, personas: PersonaSource) -> Self {
    self.personas = personas;
    self
  }

  pub fn with_artifacts(mut self, artifacts: ArtifactGenerator) -> Self {
    self.artifacts = artifacts;
    self
  }

  pub fn with_history_window(mut self, history: HistoryWindow) -> Self {
    self.history = history;
    self
  }

  pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
    self.max_tokens = max_tokens;
    self
  }

  pub fn get_available_models(&self) -> Vec<ModelInfo> { self.models.list() }

  /// One summary per session, most recently active first.
  pub async fn get_user_sessions(&self, user_id: &str) -> Result<Vec<SessionSummary>, ChatError> {
    let messages = self.store.user_messages(user_id).await.map_err(store_err)?;
    Ok(summarize_sessions(&messages))
  }

  pub async fn get_session_messages(
    &self,
    user_id: &str,
    session_id: &str,
  ) -> Result<Vec<Message>, ChatError> {
    self.store.session_messages(user_id, session_id).await.map_err(store_err)
  }

  pub async fn send_message(&self, req: SendMessage) -> Result<ChatReply, ChatError> {
    let _uploads = UploadGuard::new(&req.files);

    let session_id = req
      .session_id
      .as_deref()
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(str::to_owned)
      .unwrap_or_else(|| generate_session_id(Utc::now()));
    let request_type = classify(&req.message);
    let spec = self.models.resolve(req.model.as_deref());
    let instructions = req.user_instructions.as_deref().unwrap_or("").trim();

    tracing::info!(
      user_id = %req.user_id,
      %session_id,
      %request_type,
      model = %spec.id,
      files = req.files.len(),
      "chat message received"
    );

    let history = self
      .store
      .session_messages(&req.user_id, &session_id)
      .await
      .map_err(store_err)?;
    let title = history
      .first()
      .map(|m| m.session_title.clone())
      .unwrap_or_else(|| session_title(&req.message));

    self
      .store
      .append_message(Message {
        user_id: req.user_id.clone(),
        timestamp: Utc::now(),
        session_id: session_id.clone(),
        role: Role::User,
        content: req.message.clone(),
        session_title: title.clone(),
        model_used: spec.id.clone(),
        request_type,
        sources: None,
        user_instructions: (!instructions.is_empty()).then(|| instructions.to_string()),
      })
      .await
      .map_err(store_err)?;

    let mut query = req.message.clone();
    if !req.files.is_empty() {
      query.push_str("\n\nFile Analysis:\n");
      query.push_str(&self.describe_uploads(&req.files).await);
    }

    let retrieved = self.knowledge.retrieve(&query).await.unwrap_or_else(|e| {
      tracing::warn!(error = %e, "knowledge base retrieval failed, continuing without context");
      Retrieved::default()
    });

    let persona = self
      .personas
      .load(PromptType::parse_lenient(req.prompt_type.as_deref()))
      .await;
    let history_text = summarize_history(&history, self.history);
    let prompt = assemble(&PromptInput {
      query: &query,
      context: &retrieved.context,
      persona: &persona,
      user_instructions: instructions,
      history: &history_text,
      request_type,
    });

    let attachments = read_attachments(&req.files).await;
    let (response, completed) = match self.complete(spec, prompt, attachments).await {
      Ok(raw) => (format_response(&raw), true),
      Err(e) => {
        tracing::error!(model = %spec.id, error = %e, "completion failed");
        (format!("{COMPLETION_ERROR_PREFIX} {e}"), false)
      }
    };

    self
      .store
      .append_message(Message {
        user_id: req.user_id.clone(),
        timestamp: Utc::now(),
        session_id: session_id.clone(),
        role: Role::Assistant,
        content: response.clone(),
        session_title: title,
        model_used: spec.id.clone(),
        request_type,
        sources: Some(retrieved.sources.clone()),
        user_instructions: None,
      })
      .await
      .map_err(store_err)?;

    let output_files = if completed {
      self
        .artifacts
        .generate(request_type, &req.message, &session_id, &response)
        .await
        .into_iter()
        .collect()
    } else {
      Vec::new()
    };

    Ok(ChatReply {
      response,
      session_id,
      model_used: spec.id.clone(),
      sources: retrieved.sources,
      request_type,
      output_files,
    })
  }

  /// Text descriptions of the uploads. Parsing runs on the blocking pool.
  async fn describe_uploads(&self, files: &[UploadedFile]) -> String {
    let extraction = self.extraction.clone();
    let owned = files.to_vec();
    match tokio::task::spawn_blocking(move || extraction.describe(&owned)).await {
      Ok(text) => text,
      Err(e) => {
        tracing::error!(error = %e, "upload extraction task failed");
        files
          .iter()
          .map(|f| format!("File: {} (error reading: {e})", f.filename))
          .collect::<Vec<_>>()
          .join("\n\n")
      }
    }
  }

  async fn complete(
    &self,
    spec: &ModelSpec,
    prompt: String,
    attachments: Vec<Attachment>,
  ) -> Result<String, UpstreamError> {
    let client = self.completions.get(&spec.provider).ok_or_else(|| {
      UpstreamError::NotConfigured(format!("no {} client for model {}", spec.provider, spec.id))
    })?;
    tracing::debug!(client = client.provider(), model = %spec.model, "calling completion API");

    client
      .complete(&CompletionRequest {
        model: spec.model.clone(),
        prompt,
        attachments,
        max_tokens: self.max_tokens,
      })
      .await
  }
}

/// Raw bytes of the uploads a model can interpret directly. Unreadable files
/// are skipped; their text description already carries the error.
async fn read_attachments(files: &[UploadedFile]) -> Vec<Attachment> {
  let mut out = Vec::new();
  for file in files.iter().filter(|f| f.is_multimodal()) {
    match tokio::fs::read(&file.path).await {
      Ok(data) => out.push(Attachment {
        filename:     file.filename.clone(),
        content_type: file.content_type.clone(),
        data:         data.into(),
      }),
      Err(e) => tracing::warn!(file = %file.filename, error = %e, "skipping unreadable attachment"),
    }
  }
  out
}
