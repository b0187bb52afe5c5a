//! Error types for the cache benchmark.
//!
//! Every fallible operation in the crate returns [`Result`]. Failures coming
//! back from a model backend are folded into a small set of variants so the
//! runner can print them with context, whichever backend produced them:
//!
//! | Error | Source |
//! |-------|--------|
//! | [`Error::Http`] | HTTP client failure (reqwest) |
//! | [`Error::Json`] | JSON encode/decode failure |
//! | [`Error::Io`] | Writing the report to the console failed |
//! | [`Error::Network`] | Connection, dispatch or timeout failure |
//! | [`Error::Authentication`] | Missing or rejected credentials |
//! | [`Error::Throttled`] | The service rate-limited the call |
//! | [`Error::InvalidRequest`] | The payload was rejected as malformed |
//! | [`Error::Service`] | The service failed on its side |
//! | [`Error::Config`] | The benchmark configuration is unusable |
//! | [`Error::Tokenizer`] | The local tokenizer could not be loaded |
//!
//! # Example
//!
//! ```rust
//! use bedrock_cache_bench::Error;
//!
//! fn describe(err: &Error) -> &'static str {
//!     match err {
//!         Error::Authentication(_) => "check your AWS credentials",
//!         Error::Throttled { .. } => "slow down",
//!         Error::InvalidRequest(_) => "fix the payload",
//!         _ => "see the message",
//!     }
//! }
//! ```

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for benchmark operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed.
    ///
    /// This wraps errors from the underlying HTTP client (reqwest).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to encode a request or decode a response.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Console output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection failed, timed out, or was interrupted before a response arrived.
    #[error("Network error: {0}")]
    Network(String),

    /// Credentials are missing, expired, or lack permission for the model.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The service throttled the request.
    #[error("Request throttled: {message}")]
    Throttled {
        /// Seconds to wait before retrying, when the service said so
        retry_after: Option<u64>,
        /// Error message from the service
        message: String,
    },

    /// The request was malformed or referenced something that does not exist.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The service returned an error of its own.
    #[error("Service error{}: {message}", status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    Service {
        /// HTTP status code, when the backend exposes one
        status: Option<u16>,
        /// Error message
        message: String,
    },

    /// The benchmark configuration cannot be used.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The local token counter failed to initialize.
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),
}

/// Anthropic API error body
#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorResponse {
    #[serde(rename = "type")]
    pub error_type: String,
    pub error: ApiErrorDetail,
}

#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorDetail {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}
