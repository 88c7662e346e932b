//! Static table mapping short model ids onto providers and provider model
//! names.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Which API family serves a model.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Provider {
  Anthropic,
  OpenAi,
}

/// One selectable model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
  /// Short id used by clients and recorded on messages.
  pub id:           String,
  pub display_name: String,
  pub provider:     Provider,
  /// Name sent to the provider API.
  pub model:        String,
}

impl ModelSpec {
  pub fn new(
    id: impl Into<String>,
    display_name: impl Into<String>,
    provider: Provider,
    model: impl Into<String>,
  ) -> Self {
    Self {
      id: id.into(),
      display_name: display_name.into(),
      provider,
      model: model.into(),
    }
  }
}

/// Listing entry for `GET /api/models`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
  pub id:           String,
  pub display_name: String,
}

pub const DEFAULT_MODEL_ID: &str = "claude-sonnet-4";

/// Models available to clients. Unknown ids resolve to the default.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
  specs:   Vec<ModelSpec>,
  default: usize,
}

impl Default for ModelRegistry {
  fn default() -> Self {
    Self {
      specs:   vec![
        ModelSpec::new(
          DEFAULT_MODEL_ID,
          "Claude Sonnet 4",
          Provider::Anthropic,
          "claude-sonnet-4-20250514",
        ),
        ModelSpec::new("gpt-4o", "GPT-4o", Provider::OpenAi, "gpt-4o"),
      ],
      default: 0,
    }
  }
}

impl ModelRegistry {
  /// Build a registry from configured specs. Returns `None` when `specs` is
  /// empty or `default_id` names none of them.
  pub fn new(specs: Vec<ModelSpec>, default_id: &str) -> Option<Self> {
    let default = specs.iter().position(|s| s.id == default_id)?;
    Some(Self { specs, default })
  }

  pub fn default_spec(&self) -> &ModelSpec { &self.specs[self.default] }

  /// Look up `id`, falling back to the default for unknown or missing ids.
  pub fn resolve(&self, id: Option<&str>) -> &ModelSpec {
    id.and_then(|id| self.specs.iter().find(|s| s.id == id))
      .unwrap_or_else(|| self.default_spec())
  }

  pub fn list(&self) -> Vec<ModelInfo> {
    self
      .specs
      .iter()
      .map(|s| ModelInfo { id: s.id.clone(), display_name: s.display_name.clone() })
      .collect()
  }

  /// Providers referenced by at least one model.
  pub fn providers(&self) -> Vec<Provider> {
    let mut out: Vec<Provider> = Vec::new();
    for spec in &self.specs {
      if !out.contains(&spec.provider) {
        out.push(spec.provider);
      }
    }
    out
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn known_id_resolves() {
    let reg = ModelRegistry::default();
    let spec = reg.resolve(Some("gpt-4o"));
    assert_eq!(spec.provider, Provider::OpenAi);
    assert_eq!(spec.model, "gpt-4o");
  }

  #[test]
  fn unknown_or_missing_id_falls_back_to_default() {
    let reg = ModelRegistry::default();
    assert_eq!(reg.resolve(Some("nova-pro")).id, DEFAULT_MODEL_ID);
    assert_eq!(reg.resolve(None).id, DEFAULT_MODEL_ID);
  }

  #[test]
  fn new_requires_default_to_exist() {
    let specs = vec![ModelSpec::new("a", "A", Provider::Anthropic, "a-1")];
    assert!(ModelRegistry::new(specs.clone(), "b").is_none());
    assert!(ModelRegistry::new(Vec::new(), "a").is_none());

    let reg = ModelRegistry::new(specs, "a").unwrap();
    assert_eq!(reg.resolve(Some("zzz")).model, "a-1");
  }

  #[test]
  fn list_exposes_id_and_display_name() {
    let listed = ModelRegistry::default().list();
    assert_eq!(listed[0], ModelInfo {
      id:           DEFAULT_MODEL_ID.into(),
      display_name: "Claude Sonnet 4".into(),
    });
    assert_eq!(listed.len(), 2);
  }

  #[test]
  fn provider_strings() {
    assert_eq!(Provider::OpenAi.to_string(), "openai");
    assert_eq!(serde_json::to_string(&Provider::Anthropic).unwrap(), "\"anthropic\"");
    let parsed: Provider = serde_json::from_str("\"openai\"").unwrap();
    assert_eq!(parsed, Provider::OpenAi);
  }

  #[test]
  fn providers_are_deduplicated() {
    let reg = ModelRegistry::new(
      vec![
        ModelSpec::new("a", "A", Provider::Anthropic, "a-1"),
        ModelSpec::new("b", "B", Provider::Anthropic, "b-1"),
      ],
      "a",
    )
    .unwrap();
    assert_eq!(reg.providers(), vec![Provider::Anthropic]);
  }
}
