//! # Bedrock prompt caching benchmark
//!
//! Sends two requests that share one large, cache-marked system prefix and
//! reports latency and token usage for each, so the effect of prompt caching
//! on a Claude model can be observed directly.
//!
//! Requests go through the [`InferenceClient`] trait. [`ModelClient`] talks to
//! AWS Bedrock (Converse API) or to the Anthropic Messages API.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # #[cfg(feature = "bedrock")]
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use bedrock_cache_bench::{run, BenchConfig, ModelClient, Reporter};
//!
//! let config = BenchConfig::default();
//! config.validate()?;
//!
//! let client = ModelClient::bedrock(&config.region).await?;
//! run(&client, &config, &mut Reporter::stdio()).await?;
//! # Ok(())
//! # }
//! ```

mod anthropic;
#[cfg(feature = "bedrock")]
mod bedrock;

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod report;
pub mod runner;
pub mod tokens;
pub mod types;

// Re-export main types for convenience
pub use client::{Backend, InferenceClient, ModelClient};
pub use config::BenchConfig;
pub use error::{Error, Result};
pub use models::{BedrockRegion, Model};
pub use report::Reporter;
pub use runner::{run, CallReport, RunOutcome};
pub use tokens::TokenCounter;
pub use types::{
    CachePoint, ContentBlock, ConverseRequest, ConverseResponse, Message, Role, SystemContent,
    Usage,
};
