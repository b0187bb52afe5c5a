//! Request and response types for cached inference calls.
//!
//! The shapes follow the Bedrock Converse API:
//!
//! - [`ConverseRequest`] - model id, messages, and system content
//! - [`ConverseResponse`] - generated text, stop reason, and [`Usage`]
//! - [`ContentBlock`] - either text or a [`CachePoint`]
//! - [`SystemContent`] - system blocks shared between requests
//!
//! # Example
//!
//! ```rust
//! use bedrock_cache_bench::types::{ContentBlock, ConverseRequest, Message, SystemContent};
//!
//! let system = SystemContent::new(vec![
//!     ContentBlock::text("You are a helpful assistant."),
//!     ContentBlock::cache_point(),
//! ]);
//!
//! let first = ConverseRequest::new(
//!     "us.anthropic.claude-3-5-haiku-20241022-v1:0",
//!     vec![Message::user("Hello!")],
//!     system.clone(),
//! );
//! let second = ConverseRequest::new(
//!     "us.anthropic.claude-3-5-haiku-20241022-v1:0",
//!     vec![Message::user("Hello again!")],
//!     system,
//! );
//!
//! assert!(first.system.shares_with(&second.system));
//! ```

use serde::{Deserialize, Serialize, Serializer};
use std::sync::Arc;

/// Role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Content block in a message or in the system content.
///
/// A block list may interleave text with cache points. Everything before a
/// cache point in the same list is eligible for server-side caching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentBlock {
    /// Text content
    Text(String),
    /// Cache boundary marker
    CachePoint(CachePoint),
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text(text.into())
    }

    pub fn cache_point() -> Self {
        ContentBlock::CachePoint(CachePoint::default())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text(text) => Some(text),
            ContentBlock::CachePoint(_) => None,
        }
    }

    pub fn is_cache_point(&self) -> bool {
        matches!(self, ContentBlock::CachePoint(_))
    }
}

/// Cache point for prompt caching
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePoint {
    #[serde(rename = "type")]
    pub cache_type: CachePointType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CachePointType {
    #[default]
    Default,
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    /// Create a user message with a single text block
    pub fn user(text: impl Into<String>) -> Self {
        Self::user_blocks(vec![ContentBlock::text(text)])
    }

    /// Create a user message from explicit blocks
    pub fn user_blocks(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::User,
            content,
        }
    }
}

/// System content shared across requests.
///
/// Cloning is cheap and keeps pointing at the same blocks, so every request
/// built from one value carries a byte-identical system prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemContent(Arc<[ContentBlock]>);

impl SystemContent {
    pub fn new(blocks: Vec<ContentBlock>) -> Self {
        Self(blocks.into())
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn blocks(&self) -> &[ContentBlock] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when both values point at the same allocation
    pub fn shares_with(&self, other: &SystemContent) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// True when the last block is a cache point
    pub fn ends_with_cache_point(&self) -> bool {
        self.0.last().is_some_and(ContentBlock::is_cache_point)
    }
}

impl Serialize for SystemContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.blocks().serialize(serializer)
    }
}

/// Inference parameters sent with each request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceConfig {
    pub max_tokens: u32,
}

/// Request to the model
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseRequest {
    /// Model identifier (e.g., "us.anthropic.claude-3-5-haiku-20241022-v1:0")
    pub model_id: String,

    /// Conversation messages
    pub messages: Vec<Message>,

    /// System content
    #[serde(skip_serializing_if = "SystemContent::is_empty")]
    pub system: SystemContent,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub inference_config: Option<InferenceConfig>,
}

impl ConverseRequest {
    pub fn new(model_id: impl Into<String>, messages: Vec<Message>, system: SystemContent) -> Self {
        Self {
            model_id: model_id.into(),
            messages,
            system,
            inference_config: None,
        }
    }

    /// Cap the number of generated tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.inference_config = Some(InferenceConfig { max_tokens });
        self
    }

    pub fn max_tokens(&self) -> Option<u32> {
        self.inference_config.map(|c| c.max_tokens)
    }
}

/// Token usage information.
///
/// Fields the backend reports beyond the known counters are kept in `extra`
/// and printed as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u32>,

    /// Tokens read from cache (prompt caching)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_read_input_tokens: Option<u32>,

    /// Tokens written to cache (prompt caching)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_write_input_tokens: Option<u32>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Usage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            ..Self::default()
        }
    }
}

/// Response from the model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseResponse {
    pub content: Vec<ContentBlock>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// Latency measured by the service itself, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_latency_ms: Option<u64>,
}

impl ConverseResponse {
    /// Concatenated text of all text blocks
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect::<Vec<_>>()
            .join("")
    }
}
