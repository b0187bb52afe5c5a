//! Translation between crate types and the Bedrock Converse API

use crate::error::{Error, Result};
use crate::types::{ContentBlock, ConverseRequest, ConverseResponse, Message, Role, Usage};
use aws_sdk_bedrockruntime::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_bedrockruntime::operation::converse::{ConverseError, ConverseOutput};
use aws_sdk_bedrockruntime::types::{
    self as sdk, CachePointBlock, CachePointType, ConversationRole, InferenceConfiguration,
    SystemContentBlock, TokenUsage,
};

/// Error codes Bedrock reports for bad or expired credentials
const CREDENTIAL_ERROR_CODES: &[&str] = &[
    "UnrecognizedClientException",
    "ExpiredTokenException",
    "InvalidSignatureException",
];

fn cache_point_block() -> Result<CachePointBlock> {
    CachePointBlock::builder()
        .r#type(CachePointType::Default)
        .build()
        .map_err(|e| Error::InvalidRequest(format!("cache point: {}", e)))
}

pub(crate) fn system_blocks(request: &ConverseRequest) -> Result<Vec<SystemContentBlock>> {
    request
        .system
        .blocks()
        .iter()
        .map(|block| -> Result<SystemContentBlock> {
            match block {
                ContentBlock::Text(text) => Ok(SystemContentBlock::Text(text.clone())),
                ContentBlock::CachePoint(_) => {
                    Ok(SystemContentBlock::CachePoint(cache_point_block()?))
                }
            }
        })
        .collect()
}

fn content_block(block: &ContentBlock) -> Result<sdk::ContentBlock> {
    match block {
        ContentBlock::Text(text) => Ok(sdk::ContentBlock::Text(text.clone())),
        ContentBlock::CachePoint(_) => Ok(sdk::ContentBlock::CachePoint(cache_point_block()?)),
    }
}

fn message(message: &Message) -> Result<sdk::Message> {
    let role = match message.role {
        Role::User => ConversationRole::User,
        Role::Assistant => ConversationRole::Assistant,
    };
    let content = message
        .content
        .iter()
        .map(content_block)
        .collect::<Result<Vec<_>>>()?;

    sdk::Message::builder()
        .role(role)
        .set_content(Some(content))
        .build()
        .map_err(|e| Error::InvalidRequest(format!("message: {}", e)))
}

pub(crate) fn messages(request: &ConverseRequest) -> Result<Vec<sdk::Message>> {
    request.messages.iter().map(message).collect()
}

pub(crate) fn inference_config(request: &ConverseRequest) -> Option<InferenceConfiguration> {
    request.max_tokens().map(|max_tokens| {
        InferenceConfiguration::builder()
            .max_tokens(i32::try_from(max_tokens).unwrap_or(i32::MAX))
            .build()
    })
}

fn count(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

/// Counters beyond the five known fields, keyed the way Converse names them
fn extra_usage(usage: &TokenUsage) -> serde_json::Map<String, serde_json::Value> {
    let mut extra = serde_json::Map::new();
    if !usage.cache_details().is_empty() {
        let details = usage
            .cache_details()
            .iter()
            .map(|detail| {
                serde_json::json!({
                    "ttl": detail.ttl().as_str(),
                    "inputTokens": count(detail.input_tokens()),
                })
            })
            .collect();
        extra.insert("cacheDetails".into(), serde_json::Value::Array(details));
    }
    extra
}

fn usage(usage: &TokenUsage) -> Usage {
    Usage {
        input_tokens: count(usage.input_tokens()),
        output_tokens: count(usage.output_tokens()),
        total_tokens: Some(count(usage.total_tokens())),
        cache_read_input_tokens: usage.cache_read_input_tokens().map(count),
        cache_write_input_tokens: usage.cache_write_input_tokens().map(count),
        extra: extra_usage(usage),
    }
}

pub(crate) fn response(output: &ConverseOutput) -> ConverseResponse {
    let content = match output.output() {
        Some(sdk::ConverseOutput::Message(message)) => message
            .content()
            .iter()
            .filter_map(|block| block.as_text().ok())
            .map(|text| ContentBlock::Text(text.clone()))
            .collect(),
        _ => Vec::new(),
    };

    ConverseResponse {
        content,
        stop_reason: Some(output.stop_reason().as_str().to_string()),
        usage: output.usage().map(usage),
        server_latency_ms: output
            .metrics()
            .and_then(|m| u64::try_from(m.latency_ms()).ok()),
    }
}

/// Fold an SDK failure into the crate error taxonomy
pub(crate) fn map_error(err: SdkError<ConverseError>) -> Error {
    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
            return Error::Network(DisplayErrorContext(&err).to_string());
        }
        SdkError::ConstructionFailure(_) => {
            return Error::InvalidRequest(DisplayErrorContext(&err).to_string());
        }
        _ => {}
    }

    let status = err.raw_response().map(|r| r.status().as_u16());
    let service = err.into_service_error();
    let message = service
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&service).to_string());

    if service.is_access_denied_exception()
        || service
            .code()
            .is_some_and(|code| CREDENTIAL_ERROR_CODES.contains(&code))
    {
        Error::Authentication(message)
    } else if service.is_throttling_exception() {
        Error::Throttled {
            retry_after: None,
            message,
        }
    } else if service.is_validation_exception() || service.is_resource_not_found_exception() {
        Error::InvalidRequest(message)
    } else {
        Error::Service { status, message }
    }
}
