//! Wire format for the Anthropic Messages API
//!
//! The Messages API has no standalone cache-point block. Instead the block
//! that ends a cached prefix carries `cache_control: {"type": "ephemeral"}`,
//! so each cache point is folded onto the text block right before it.

use crate::error::{Error, Result};
use crate::models;
use crate::types::{ContentBlock, ConverseRequest, ConverseResponse, Message, Role, Usage};
use serde::{Deserialize, Serialize};

/// Used when the request carries no inference config; the API requires a value
const DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Serialize)]
pub(crate) struct MessagesBody<'a> {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    system: Vec<WireBlock<'a>>,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: Role,
    content: Vec<WireBlock<'a>>,
}

#[derive(Debug, Serialize)]
struct WireBlock<'a> {
    #[serde(rename = "type")]
    block_type: &'static str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_control: Option<CacheControl>,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct CacheControl {
    #[serde(rename = "type")]
    cache_type: &'static str,
}

impl CacheControl {
    const EPHEMERAL: CacheControl = CacheControl {
        cache_type: "ephemeral",
    };
}

impl<'a> MessagesBody<'a> {
    pub(crate) fn from_request(request: &'a ConverseRequest) -> Result<Self> {
        let messages = request
            .messages
            .iter()
            .map(wire_message)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            model: anthropic_model_id(&request.model_id),
            max_tokens: request.max_tokens().unwrap_or(DEFAULT_MAX_TOKENS),
            system: fold_blocks(request.system.blocks())?,
            messages,
        })
    }
}

/// Map a Bedrock model id to its Anthropic API id; unknown ids pass through
fn anthropic_model_id(model_id: &str) -> String {
    models::get_model_by_bedrock_id(model_id)
        .map(|m| m.anthropic_id.to_string())
        .unwrap_or_else(|| model_id.to_string())
}

fn wire_message(message: &Message) -> Result<WireMessage<'_>> {
    Ok(WireMessage {
        role: message.role,
        content: fold_blocks(&message.content)?,
    })
}

fn fold_blocks(blocks: &[ContentBlock]) -> Result<Vec<WireBlock<'_>>> {
    let mut out: Vec<WireBlock<'_>> = Vec::with_capacity(blocks.len());
    for block in blocks {
        match block {
            ContentBlock::Text(text) => out.push(WireBlock {
                block_type: "text",
                text,
                cache_control: None,
            }),
            ContentBlock::CachePoint(_) => match out.last_mut() {
                Some(previous) => previous.cache_control = Some(CacheControl::EPHEMERAL),
                None => {
                    return Err(Error::InvalidRequest(
                        "cache point must follow a text block".into(),
                    ))
                }
            },
        }
    }
    Ok(out)
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessagesReply {
    #[serde(default)]
    content: Vec<ReplyBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ReplyBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    input_tokens: u32,
    output_tokens: u32,
    #[serde(default)]
    cache_creation_input_tokens: Option<u32>,
    #[serde(default)]
    cache_read_input_tokens: Option<u32>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl From<WireUsage> for Usage {
    fn from(wire: WireUsage) -> Self {
        Usage {
            input_tokens: wire.input_tokens,
            output_tokens: wire.output_tokens,
            total_tokens: None,
            cache_read_input_tokens: wire.cache_read_input_tokens,
            cache_write_input_tokens: wire.cache_creation_input_tokens,
            extra: wire.extra,
        }
    }
}

impl From<MessagesReply> for ConverseResponse {
    fn from(reply: MessagesReply) -> Self {
        let content = reply
            .content
            .into_iter()
            .filter_map(|block| match block {
                ReplyBlock::Text { text } => Some(ContentBlock::Text(text)),
                ReplyBlock::Other => None,
            })
            .collect();

        ConverseResponse {
            content,
            stop_reason: reply.stop_reason,
            usage: reply.usage.map(Usage::from),
            server_latency_ms: None,
        }
    }
}
