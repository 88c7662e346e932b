//! OpenAI-compatible chat completions client.

use async_trait::async_trait;
use counsel_core::upstream::{CompletionModel, CompletionRequest, UpstreamError};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::http;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
  pub api_key:      String,
  #[serde(default = "default_base_url")]
  pub base_url:     String,
  #[serde(default = "http::default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_base_url() -> String { DEFAULT_BASE_URL.into() }

pub struct OpenAiClient {
  client:          Client,
  config:          OpenAiConfig,
  completions_url: String,
}

impl OpenAiClient {
  pub fn new(config: OpenAiConfig) -> Result<Self, UpstreamError> {
    let client = http::client(config.timeout_secs)?;
    let completions_url = http::join_url(&config.base_url, "chat/completions");
    Ok(Self { client, config, completions_url })
  }

  /// JSON body for one single-turn request. Only images travel as data-URL
  /// parts; everything else reaches the model through the prompt text.
  pub fn request_body(request: &CompletionRequest) -> Value {
    let images: Vec<Value> = request
      .attachments
      .iter()
      .filter(|att| att.content_type.starts_with("image/"))
      .map(|att| {
        let url = format!("data:{};base64,{}", att.content_type, http::base64(&att.data));
        json!({ "type": "image_url", "image_url": { "url": url } })
      })
      .collect();

    let content = if images.is_empty() {
      json!(request.prompt)
    } else {
      let mut parts = vec![json!({ "type": "text", "text": request.prompt })];
      parts.extend(images);
      Value::Array(parts)
    };

    json!({
      "model":      request.model,
      "max_tokens": request.max_tokens,
      "messages":   [{ "role": "user", "content": content }],
    })
  }

  pub fn parse_reply(body: &str) -> Result<String, UpstreamError> {
    let resp: ChatResponse = http::decode(body)?;
    resp
      .choices
      .into_iter()
      .next()
      .and_then(|c| c.message.content)
      .filter(|text| !text.is_empty())
      .ok_or_else(|| UpstreamError::Decode("response contained no message content".into()))
  }
}

#[derive(Deserialize)]
struct ChatResponse {
  choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
  message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
  content: Option<String>,
}

#[async_trait]
impl CompletionModel for OpenAiClient {
  fn provider(&self) -> &'static str { "openai" }

  async fn complete(&self, request: &CompletionRequest) -> Result<String, UpstreamError> {
    tracing::debug!(
      model = %request.model,
      attachments = request.attachments.len(),
      "sending chat completion request"
    );

    let req = self
      .client
      .post(&self.completions_url)
      .bearer_auth(&self.config.api_key)
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
      model: "gpt-4o".into(),
      prompt: "Summarise the lease".into(),
      attachments,
      max_tokens: 4000,
    }
  }

  #[test]
  fn text_only_prompt_is_a_plain_string() {
    let body = OpenAiClient::request_body(&request(Vec::new()));
    assert_eq!(body["messages"][0]["content"], "Summarise the lease");
    assert_eq!(body["model"], "gpt-4o");
  }

  #[test]
  fn images_become_data_urls() {
    let body = OpenAiClient::request_body(&request(vec![
      Attachment {
        filename:     "scan.jpg".into(),
        content_type: "image/jpeg".into(),
        data:         Bytes::from_static(b"abc"),
      },
      Attachment {
        filename:     "lease.pdf".into(),
        content_type: "application/pdf".into(),
        data:         Bytes::from_static(b"%PDF"),
      },
    ]));

    let parts = body["messages"][0]["content"].as_array().unwrap();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0]["type"], "text");
    assert_eq!(parts[1]["image_url"]["url"], "data:image/jpeg;base64,YWJj");
  }

  #[test]
  fn first_choice_content_is_returned() {
    let body = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"Done."}}]}"#;
    assert_eq!(OpenAiClient::parse_reply(body).unwrap(), "Done.");
  }

  #[test]
  fn missing_choices_is_decode_error() {
    assert!(matches!(
      OpenAiClient::parse_reply(r#"{"choices":[]}"#),
      Err(UpstreamError::Decode(_))
    ));
    assert!(matches!(
      OpenAiClient::parse_reply("not json"),
      Err(UpstreamError::Decode(_))
    ));
  }
}
