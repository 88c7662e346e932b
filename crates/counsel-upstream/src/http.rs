//! Shared plumbing for the `reqwest` based adapters.

use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use counsel_core::upstream::UpstreamError;
use reqwest::{Client, RequestBuilder};

pub(crate) fn transport(err: reqwest::Error) -> UpstreamError {
  UpstreamError::Transport(err.to_string())
}

pub(crate) fn client(timeout_secs: u64) -> Result<Client, UpstreamError> {
  Client::builder()
    .timeout(Duration::from_secs(timeout_secs))
    .build()
    .map_err(transport)
}

/// Send `req` and return the response body, turning non-2xx statuses into
/// [`UpstreamError::Status`].
pub(crate) async fn send(req: RequestBuilder) -> Result<String, UpstreamError> {
  let resp = req.send().await.map_err(transport)?;
  let status = resp.status();
  let body = resp.text().await.map_err(transport)?;

  if !status.is_success() {
    return Err(UpstreamError::Status { status: status.as_u16(), body });
  }
  Ok(body)
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, UpstreamError> {
  serde_json::from_str(body).map_err(|e| UpstreamError::Decode(e.to_string()))
}

pub(crate) fn base64(data: &[u8]) -> String { STANDARD.encode(data) }

pub(crate) fn join_url(base: &str, path: &str) -> String {
  format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

pub(crate) fn default_timeout_secs() -> u64 { 60 }
