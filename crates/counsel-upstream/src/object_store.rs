//! Object stores for generated artifacts.
//!
//! [`FsObjectStore`] writes under a local directory that the server exposes
//! at `/files`; [`HttpObjectStore`] PUTs to an S3-style endpoint.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use counsel_core::upstream::{ObjectStore, UpstreamError};
use reqwest::Client;
use serde::Deserialize;

use crate::http;

/// Reject keys that could escape the store root.
fn checked_key(key: &str) -> Result<&Path, UpstreamError> {
  let path = Path::new(key);
  let safe = !key.is_empty()
    && path.components().all(|c| matches!(c, Component::Normal(_)));
  if safe {
    Ok(path)
  } else {
    Err(UpstreamError::NotConfigured(format!("invalid object key: {key:?}")))
  }
}

// ─── Filesystem ──────────────────────────────────────────────────────────────

pub struct FsObjectStore {
  root:            PathBuf,
  public_base_url: String,
}

impl FsObjectStore {
  pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
    Self { root: root.into(), public_base_url: public_base_url.into() }
  }

}

#[async_trait]
impl ObjectStore for FsObjectStore {
  async fn put(&self, key: &str, body: Bytes, _content_type: &str) -> Result<String, UpstreamError> {
    let path = self.root.join(checked_key(key)?);
    if let Some(parent) = path.parent() {
      tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, &body).await?;

    tracing::debug!(key, bytes = body.len(), "stored artifact on disk");
    Ok(http::join_url(&self.public_base_url, key))
  }
}

// ─── HTTP ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct HttpObjectStoreConfig {
  /// Base URL of the store, e.g. `https://storage.example.com`.
  pub endpoint:        String,
  pub bucket:          String,
  /// Prefix of the URLs handed to clients.
  pub public_base_url: String,
  #[serde(default)]
  pub api_key:         Option<String>,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs:    u64,
}

fn default_timeout_secs() -> u64 { 30 }

pub struct HttpObjectStore {
  client: Client,
  config: HttpObjectStoreConfig,
}

impl HttpObjectStore {
  pub fn new(config: HttpObjectStoreConfig) -> Result<Self, UpstreamError> {
    let client = http::client(config.timeout_secs)?;
    Ok(Self { client, config })
  }

  fn object_url(&self, key: &str) -> String {
    http::join_url(&http::join_url(&self.config.endpoint, &self.config.bucket), key)
  }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
  async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<String, UpstreamError> {
    checked_key(key)?;

    let mut req = self
      .client
      .put(self.object_url(key))
      .header(reqwest::header::CONTENT_TYPE, content_type)
      .body(body);
    if let Some(token) = &self.config.api_key {
      req = req.bearer_auth(token);
    }
    http::send(req).await?;

    Ok(http::join_url(&self.config.public_base_url, key))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn fs_store_writes_nested_key() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsObjectStore::new(dir.path(), "http://localhost:5000/files/");

    let url = store
      .put("tables/session_1_abc.csv", Bytes::from_static(b"a,b\n"), "text/csv")
      .await
      .unwrap();

    assert_eq!(url, "http://localhost:5000/files/tables/session_1_abc.csv");
    let written = std::fs::read(dir.path().join("tables/session_1_abc.csv")).unwrap();
    assert_eq!(written, b"a,b\n");
  }

  #[tokio::test]
  async fn fs_store_rejects_escaping_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsObjectStore::new(dir.path(), "http://localhost/files");

    for key in ["../outside.pdf", "/etc/passwd", ""] {
      assert!(store.put(key, Bytes::new(), "application/pdf").await.is_err(), "{key}");
    }
  }

  #[test]
  fn http_store_url_layout() {
    let store = HttpObjectStore::new(HttpObjectStoreConfig {
      endpoint:        "https://storage.example.com/".into(),
      bucket:          "legal-chat-bot-outputs".into(),
      public_base_url: "https://cdn.example.com".into(),
      api_key:         None,
      timeout_secs:    5,
    })
    .unwrap();

    assert_eq!(
      store.object_url("legal-documents/s_1.pdf"),
      "https://storage.example.com/legal-chat-bot-outputs/legal-documents/s_1.pdf"
    );
  }
}
