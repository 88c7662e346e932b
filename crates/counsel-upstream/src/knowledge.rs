//! HTTP client for the managed retrieval service.
//!
//! `POST {endpoint}/retrieve` with `{knowledge_base_id, query, max_results}`
//! answers `{results: [{content, source}]}`.

use async_trait::async_trait;
use counsel_core::upstream::{KnowledgeBase, Retrieved, UpstreamError};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::http;

#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeBaseConfig {
  pub endpoint:          String,
  pub knowledge_base_id: String,
  #[serde(default = "default_max_results")]
  pub max_results:       u32,
  #[serde(default)]
  pub api_key:           Option<String>,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs:      u64,
}

fn default_max_results() -> u32 { 5 }

fn default_timeout_secs() -> u64 { 15 }

pub struct HttpKnowledgeBase {
  client:       Client,
  config:       KnowledgeBaseConfig,
  retrieve_url: String,
}

#[derive(Debug, Serialize)]
struct RetrieveRequest<'a> {
  knowledge_base_id: &'a str,
  query:             &'a str,
  max_results:       u32,
}

#[derive(Debug, Deserialize)]
struct RetrieveResponse {
  #[serde(default)]
  results: Vec<RetrievalResult>,
}

#[derive(Debug, Deserialize)]
struct RetrievalResult {
  content: String,
  #[serde(default)]
  source:  Option<String>,
}

impl HttpKnowledgeBase {
  pub fn new(config: KnowledgeBaseConfig) -> Result<Self, UpstreamError> {
    let client = http::client(config.timeout_secs)?;
    let retrieve_url = http::join_url(&config.endpoint, "retrieve");
    Ok(Self { client, config, retrieve_url })
  }

  /// Passages joined by blank lines; sources in result order.
  pub fn parse_results(body: &str) -> Result<Retrieved, UpstreamError> {
    let resp: RetrieveResponse = http::decode(body)?;
    let mut passages = Vec::with_capacity(resp.results.len());
    let mut sources = Vec::new();

    for result in resp.results {
      passages.push(result.content);
      if let Some(source) = result.source.filter(|s| !s.is_empty()) {
        sources.push(source);
      }
    }

    Ok(Retrieved { context: passages.join("\n\n"), sources })
  }
}

#[async_trait]
impl KnowledgeBase for HttpKnowledgeBase {
  async fn retrieve(&self, query: &str) -> Result<Retrieved, UpstreamError> {
    let mut req = self.client.post(&self.retrieve_url).json(&RetrieveRequest {
      knowledge_base_id: &self.config.knowledge_base_id,
      query,
      max_results: self.config.max_results,
    });
    if let Some(key) = &self.config.api_key {
      req = req.bearer_auth(key);
    }

    let body = http::send(req).await?;
    let retrieved = Self::parse_results(&body)?;
    tracing::debug!(sources = retrieved.sources.len(), "knowledge base retrieval");
    Ok(retrieved)
  }
}
