//! Outbound adapters for the Counsel relay.
//!
//! Every external service sits behind a trait from
//! [`counsel_core::upstream`]; this crate provides the HTTP and filesystem
//! implementations plus the static model table.

pub mod anthropic;
pub mod knowledge;
pub mod models;
pub mod object_store;
pub mod openai;

mod http;

pub use anthropic::{AnthropicClient, AnthropicConfig};
pub use knowledge::{HttpKnowledgeBase, KnowledgeBaseConfig};
pub use models::{ModelInfo, ModelRegistry, ModelSpec, Provider};
pub use object_store::{FsObjectStore, HttpObjectStore, HttpObjectStoreConfig};
pub use openai::{OpenAiClient, OpenAiConfig};
