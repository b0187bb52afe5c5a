//! Benchmark configuration
//!
//! The benchmark takes no arguments. Everything it sends is fixed here and
//! can be changed by constructing a [`BenchConfig`] in code.

use crate::error::{Error, Result};
use serde::Serialize;

/// Default AWS region for the Bedrock runtime client
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default model: Claude Haiku 3.5 through the US inference profile
pub const DEFAULT_MODEL_ID: &str = "us.anthropic.claude-3-5-haiku-20241022-v1:0";

pub const DEFAULT_FILLER_SENTENCE: &str =
    "This is a test of prompt caching demonstrating the benefits of prompt caching. ";

pub const DEFAULT_FILLER_REPEAT: usize = 5000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BenchConfig {
    /// AWS region the Bedrock client talks to
    pub region: String,
    /// Model or inference-profile id sent with both requests
    pub model_id: String,
    pub max_tokens: u32,
    /// Instructions placed before the filler in the system text
    pub instruction_prefix: String,
    pub filler_sentence: String,
    /// How many times `filler_sentence` is repeated
    pub filler_repeat: usize,
    /// First user prompt, followed by its own cache point
    pub first_prompt: String,
    /// Second user prompt, sent without a cache point
    pub second_prompt: String,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            max_tokens: 1024,
            instruction_prefix: "You are a helpful assistant. Here is some reference text: "
                .to_string(),
            filler_sentence: DEFAULT_FILLER_SENTENCE.to_string(),
            filler_repeat: DEFAULT_FILLER_REPEAT,
            first_prompt: "Summarize the reference text briefly.".to_string(),
            second_prompt: "What is the first sentence of the reference text?".to_string(),
        }
    }
}

impl BenchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn with_filler_repeat(mut self, repeat: usize) -> Self {
        self.filler_repeat = repeat;
        self
    }

    /// Reject configurations that cannot produce a meaningful run
    pub fn validate(&self) -> Result<()> {
        if self.region.trim().is_empty() {
            return Err(Error::Config("region must not be empty".into()));
        }
        if self.model_id.trim().is_empty() {
            return Err(Error::Config("model_id must not be empty".into()));
        }
        if self.max_tokens == 0 {
            return Err(Error::Config("max_tokens must be greater than zero".into()));
        }
        if self.filler_repeat == 0 || self.filler_sentence.is_empty() {
            return Err(Error::Config(
                "filler text must not be empty; the cached prefix would be too small".into(),
            ));
        }
        if self.first_prompt == self.second_prompt {
            return Err(Error::Config(
                "first_prompt and second_prompt must differ".into(),
            ));
        }
        Ok(())
    }
}
