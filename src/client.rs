//! Model inference client implementation

use crate::anthropic::{MessagesBody, MessagesReply};
use crate::error::{ApiErrorResponse, Error, Result};
use crate::types::{ConverseRequest, ConverseResponse};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};

#[cfg(feature = "bedrock")]
use aws_sdk_bedrockruntime::Client as BedrockClient;

/// API endpoint for Anthropic
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Current API version
const API_VERSION: &str = "2023-06-01";

/// Anything that can answer a [`ConverseRequest`].
///
/// The benchmark runner only talks to this trait, so tests can script the
/// remote side without a network.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Send one request and wait for the complete response
    async fn converse(&self, request: &ConverseRequest) -> Result<ConverseResponse>;
}

/// Backend for model calls
pub enum Backend {
    /// Anthropic API with API key
    Anthropic { api_key: String, endpoint: String },

    /// AWS Bedrock with Bedrock runtime client
    #[cfg(feature = "bedrock")]
    Bedrock {
        region: String,
        bedrock_client: BedrockClient,
    },
}

/// Inference client for AWS Bedrock or the Anthropic API
///
/// # Example - AWS Bedrock
///
/// ```rust,no_run
/// # #[cfg(feature = "bedrock")]
/// use bedrock_cache_bench::ModelClient;
///
/// # #[cfg(feature = "bedrock")]
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = ModelClient::bedrock("us-east-1").await?;
///     Ok(())
/// }
/// # #[cfg(not(feature = "bedrock"))]
/// # fn main() {}
/// ```
///
/// # Example - Anthropic API
///
/// ```rust,no_run
/// use bedrock_cache_bench::ModelClient;
///
/// let client = ModelClient::anthropic(std::env::var("ANTHROPIC_API_KEY").unwrap_or_default());
/// ```
pub struct ModelClient {
    http: Client,
    backend: Backend,
    api_version: String,
}

impl ModelClient {
    /// Create a new client for the Anthropic API
    pub fn anthropic(api_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            backend: Backend::Anthropic {
                api_key: api_key.into(),
                endpoint: ANTHROPIC_API_URL.to_string(),
            },
            api_version: API_VERSION.to_string(),
        }
    }

    /// Point an Anthropic client at a different Messages endpoint
    ///
    /// Has no effect on a Bedrock client.
    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        if let Backend::Anthropic { endpoint, .. } = &mut self.backend {
            *endpoint = url.into();
        }
        self
    }

    /// Create a new client for AWS Bedrock
    ///
    /// This loads AWS credentials from the environment (AWS_PROFILE, AWS_ACCESS_KEY_ID, etc.)
    /// using the standard AWS credential chain. The region is always the one given here.
    #[cfg(feature = "bedrock")]
    pub async fn bedrock(region: impl Into<String>) -> Result<Self> {
        let region = region.into();

        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let bedrock_config = aws_sdk_bedrockruntime::config::Builder::from(&config)
            .region(aws_sdk_bedrockruntime::config::Region::new(region.clone()))
            .build();

        let bedrock_client = BedrockClient::from_conf(bedrock_config);

        Ok(Self {
            http: Client::new(),
            backend: Backend::Bedrock {
                region,
                bedrock_client,
            },
            api_version: API_VERSION.to_string(),
        })
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Send message to Anthropic API
    async fn send_anthropic(&self, request: &ConverseRequest) -> Result<ConverseResponse> {
        let (api_key, endpoint) = match &self.backend {
            Backend::Anthropic { api_key, endpoint } => (api_key, endpoint),
            #[allow(unreachable_patterns)]
            _ => unreachable!("send_anthropic called with non-Anthropic backend"),
        };

        let body = MessagesBody::from_request(request)?;
        debug!("Sending message to Anthropic API");

        let response = self
            .http
            .post(endpoint.as_str())
            .header("x-api-key", api_key)
            .header("anthropic-version", &self.api_version)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        debug!("Received response with status: {}", status);

        if !status.is_success() {
            return Err(self.handle_error_response(status, response).await);
        }

        let reply: MessagesReply = response.json().await?;
        Ok(reply.into())
    }

    /// Send message to AWS Bedrock
    #[cfg(feature = "bedrock")]
    async fn send_bedrock(&self, request: &ConverseRequest) -> Result<ConverseResponse> {
        let bedrock_client = match &self.backend {
            Backend::Bedrock { bedrock_client, .. } => bedrock_client,
            _ => unreachable!("send_bedrock called with non-Bedrock backend"),
        };

        debug!("Sending message to AWS Bedrock");

        let output = bedrock_client
            .converse()
            .model_id(&request.model_id)
            .set_system(Some(crate::bedrock::system_blocks(request)?))
            .set_messages(Some(crate::bedrock::messages(request)?))
            .set_inference_config(crate::bedrock::inference_config(request))
            .send()
            .await
            .map_err(crate::bedrock::map_error)?;

        debug!("Received Bedrock response: {:?}", output.stop_reason());
        Ok(crate::bedrock::response(&output))
    }

    /// Helper to handle error responses
    async fn handle_error_response(
        &self,
        status: StatusCode,
        response: reqwest::Response,
    ) -> Error {
        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|h| h.to_str().ok())
                    .and_then(|s| s.parse().ok());

                let error_body = response.text().await.unwrap_or_default();
                Error::Throttled {
                    retry_after,
                    message: error_body,
                }
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let error_body = response.text().await.unwrap_or_default();
                Error::Authentication(error_body)
            }
            StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => {
                let error_text = response.text().await.unwrap_or_default();
                match serde_json::from_str::<ApiErrorResponse>(&error_text) {
                    Ok(api_error) => Error::InvalidRequest(format!(
                        "{}: {}",
                        api_error.error.error_type, api_error.error.message
                    )),
                    Err(_) => Error::InvalidRequest(error_text),
                }
            }
            _ => {
                let error_body = response.text().await.unwrap_or_default();
                Error::Service {
                    status: Some(status.as_u16()),
                    message: error_body,
                }
            }
        }
    }
}

#[async_trait]
impl InferenceClient for ModelClient {
    #[instrument(skip(self, request), fields(model = %request.model_id))]
    async fn converse(&self, request: &ConverseRequest) -> Result<ConverseResponse> {
        match &self.backend {
            Backend::Anthropic { .. } => self.send_anthropic(request).await,
            #[cfg(feature = "bedrock")]
            Backend::Bedrock { .. } => self.send_bedrock(request).await,
        }
    }
}
