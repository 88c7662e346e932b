//! counsel-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) plus `COUNSEL__*`
//! environment variables, opens the SQLite store, wires the configured
//! upstream services and serves the JSON API over HTTP.
//!
//! ```text
//! COUNSEL__AUTH__SECRET=... COUNSEL__ANTHROPIC__API_KEY=... counsel-server
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use counsel_core::artifact::{ArtifactPolicy, DeliveryMode};
use counsel_server::{
  AppState, ServerConfig,
  artifacts::ArtifactGenerator,
  auth::TokenKeys,
  chat::ChatService,
  identity::IdentityGateway,
};
use counsel_store_sqlite::SqliteStore;
use counsel_upstream::{
  AnthropicClient, FsObjectStore, HttpKnowledgeBase, HttpObjectStore, ModelRegistry,
  OpenAiClient, Provider,
};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Counsel legal chat relay")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("COUNSEL").separator("__"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let store = Arc::new(store);

  let tokens = Arc::new(TokenKeys::new(&server_cfg.auth));
  let chat = build_chat(&server_cfg, store.clone())?;
  let identity = IdentityGateway::new(store, tokens.clone());

  let upload_dir = expand_tilde(&server_cfg.upload_dir);
  let state = AppState::new(chat, identity, tokens, upload_dir);

  let files_dir = server_cfg.artifacts.served_dir().map(expand_tilde);
  let app = counsel_server::router(state, files_dir.as_deref());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Wire the chat service from configuration.
fn build_chat(
  cfg: &ServerConfig,
  store: Arc<SqliteStore>,
) -> anyhow::Result<ChatService<SqliteStore>> {
  let models = if cfg.models.available.is_empty() {
    ModelRegistry::default()
  } else {
    let default_id = cfg
      .models
      .default_id
      .as_deref()
      .or_else(|| cfg.models.available.first().map(|m| m.id.as_str()))
      .unwrap_or_default();
    ModelRegistry::new(cfg.models.available.clone(), default_id)
      .with_context(|| format!("default model {default_id:?} is not in models.available"))?
  };

  let mut chat = ChatService::new(store)
    .with_personas(cfg.personas.clone())
    .with_history_window(cfg.history.into())
    .with_max_tokens(cfg.max_tokens);

  for provider in models.providers() {
    chat = match provider {
      Provider::Anthropic => match &cfg.anthropic {
        Some(c) => chat.with_completion(
          provider,
          Arc::new(AnthropicClient::new(c.clone()).context("failed to build anthropic client")?),
        ),
        None => {
          tracing::warn!("no [anthropic] config; anthropic models will return errors");
          chat
        }
      },
      Provider::OpenAi => match &cfg.openai {
        Some(c) => chat.with_completion(
          provider,
          Arc::new(OpenAiClient::new(c.clone()).context("failed to build openai client")?),
        ),
        None => {
          tracing::warn!("no [openai] config; openai models will return errors");
          chat
        }
      },
    };
  }
  chat = chat.with_models(models);

  if let Some(kb) = &cfg.knowledge_base {
    let client =
      HttpKnowledgeBase::new(kb.clone()).context("failed to build knowledge base client")?;
    chat = chat.with_knowledge_base(Arc::new(client));
  } else {
    tracing::info!("no knowledge base configured; prompts carry no retrieved context");
  }

  let policy = ArtifactPolicy { long_reply_threshold: cfg.artifacts.threshold() };
  let artifacts = match (cfg.artifacts.mode, &cfg.artifacts.http) {
    (DeliveryMode::Inline, _) => ArtifactGenerator::inline(policy),
    (DeliveryMode::Upload, Some(http)) => ArtifactGenerator::uploading(
      policy,
      Arc::new(HttpObjectStore::new(http.clone()).context("failed to build object store client")?),
    ),
    (DeliveryMode::Upload, None) => {
      let root = expand_tilde(&cfg.artifacts.files_dir);
      let public = format!("{}/files", cfg.public_base_url.trim_end_matches('/'));
      tracing::info!(root = %root.display(), "artifacts stored on local disk");
      ArtifactGenerator::uploading(policy, Arc::new(FsObjectStore::new(root, public)))
    }
  };

  Ok(chat.with_artifacts(artifacts))
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
