//! Anthropic Messages API client.

use async_trait::async_trait;
use counsel_core::upstream::{CompletionModel, CompletionRequest, UpstreamError};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::http;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const DEFAULT_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicConfig {
  pub api_key:      String,
  #[serde(default = "default_base_url")]
  pub base_url:     String,
  #[serde(default = "default_version")]
  pub version:      String,
  #[serde(default = "http::default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_base_url() -> String { DEFAULT_BASE_URL.into() }

fn default_version() -> String { DEFAULT_VERSION.into() }

pub struct AnthropicClient {
  client:       Client,
  config:       AnthropicConfig,
  messages_url: String,
}

impl AnthropicClient {
  pub fn new(config: AnthropicConfig) -> Result<Self, UpstreamError> {
    let client = http::client(config.timeout_secs)?;
    let messages_url = http::join_url(&config.base_url, "messages");
    Ok(Self { client, config, messages_url })
  }

  /// JSON body for one single-turn request. Images become `image` blocks and
  /// PDFs `document` blocks; other attachments are left to the prompt text.
  pub fn request_body(request: &CompletionRequest) -> Value {
    let mut content: Vec<Value> = request
      .attachments
      .iter()
      .filter_map(|att| {
        let kind = if att.content_type.starts_with("image/") {
          "image"
        } else if att.content_type == "application/pdf" {
          "document"
        } else {
          return None;
        };
        Some(json!({
          "type": kind,
          "source": {
            "type":       "base64",
            "media_type": att.content_type,
            "data":       http::base64(&att.data),
          },
        }))
      })
      .collect();
    content.push(json!({ "type": "text", "text": request.prompt }));

    json!({
      "model":      request.model,
      "max_tokens": request.max_tokens,
      "messages":   [{ "role": "user", "content": content }],
    })
  }

  /// Concatenate the text blocks of a Messages API response.
  pub fn parse_reply(body: &str) -> Result<String, UpstreamError> {
    let resp: MessagesResponse = http::decode(body)?;
    let text: String = resp
      .content
      .into_iter()
      .filter_map(|block| match block {
        ContentBlock::Text { text } => Some(text),
        ContentBlock::Other => None,
      })
      .collect();

    if text.is_empty() {
      return Err(UpstreamError::Decode("response contained no text".into()));
    }
    Ok(text)
  }
}

#[derive(Deserialize)]
struct MessagesResponse {
  content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
  Text {
    text: String,
  },
  #[serde(other)]
  Other,
}

#[async_trait]
impl CompletionModel for AnthropicClient {
  fn provider(&self) -> &'static str { "anthropic" }

  async fn complete(&self, request: &CompletionRequest) -> Result<String, UpstreamError> {
    tracing::debug!(
      model = %request.model,
      attachments = request.attachments.len(),
      "sending anthropic request"
    );

    let req = self
      .client
      .post(&self.messages_url)
      .header("x-api-key", &self.config.api_key)
      .header("anthropic-version", &self.config.version)
      .json(&Self::request_body(request));

    let body = http::send(req).await?;
    Self::parse_reply(&body)
  }
}

#[cfg(test)]
mod tests {
  use bytes::Bytes;
  use counsel_core::upload::Attachment;

  use super::*;

  fn request(attachments: Vec<Attachment>) -> CompletionRequest {
    CompletionRequest {
      model: "claude-sonnet-4-20250514".into(),
      prompt: "Draft an NDA".into(),
      attachments,
      max_tokens: 4000,
    }
  }

  fn attachment(name: &str, content_type: &str) -> Attachment {
    Attachment {
      filename:     name.into(),
      content_type: content_type.into(),
      data:         Bytes::from_static(b"abc"),
    }
  }

  #[test]
  fn plain_prompt_is_single_text_block() {
    let body = AnthropicClient::request_body(&request(Vec::new()));
    assert_eq!(body["model"], "claude-sonnet-4-20250514");
    assert_eq!(body["max_tokens"], 4000);
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(body["messages"][0]["content"], json!([{ "type": "text", "text": "Draft an NDA" }]));
  }

  #[test]
  fn images_and_pdfs_become_blocks_before_text() {
    let body = AnthropicClient::request_body(&request(vec![
      attachment("scan.png", "image/png"),
      attachment("lease.pdf", "application/pdf"),
      attachment("notes.txt", "text/plain"),
    ]));
    let content = body["messages"][0]["content"].as_array().unwrap();

    assert_eq!(content.len(), 3);
    assert_eq!(content[0]["type"], "image");
    assert_eq!(content[0]["source"]["media_type"], "image/png");
    assert_eq!(content[0]["source"]["data"], "YWJj");
    assert_eq!(content[1]["type"], "document");
    assert_eq!(content[2]["type"], "text");
  }

  #[test]
  fn reply_text_blocks_are_joined() {
    let body = r#"{"id":"msg_1","content":[
      {"type":"text","text":"Hello "},
      {"type":"tool_use","id":"t","name":"x","input":{}},
      {"type":"text","text":"there"}]}"#;
    assert_eq!(AnthropicClient::parse_reply(body).unwrap(), "Hello there");
  }

  #[test]
  fn empty_reply_is_decode_error() {
    let err = AnthropicClient::parse_reply(r#"{"content":[]}"#).unwrap_err();
    assert!(matches!(err, UpstreamError::Decode(_)));
  }
}
