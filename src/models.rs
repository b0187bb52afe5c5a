//! Model identifiers and caching metadata for Claude models on Bedrock
//!
//! Each entry records the ids a model is reachable under, the smallest prefix
//! the service will cache for it, and its list price.
//!
//! # Example
//!
//! ```rust
//! use bedrock_cache_bench::models;
//!
//! let model = models::get_model("us.anthropic.claude-3-5-haiku-20241022-v1:0").unwrap();
//! println!("{} caches prefixes of {}+ tokens", model.name, model.min_cache_tokens);
//! ```

use crate::types::Usage;

/// Cache writes are billed at 125% of the input price
pub const CACHE_WRITE_MULTIPLIER: f64 = 1.25;

/// Cache reads are billed at 10% of the input price
pub const CACHE_READ_MULTIPLIER: f64 = 0.1;

/// Model caching constraints and pricing
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    /// Human-readable model name
    pub name: &'static str,

    /// Anthropic API model identifier
    pub anthropic_id: &'static str,

    /// AWS Bedrock regional endpoint model identifier
    pub bedrock_id: &'static str,

    /// AWS Bedrock global endpoint model identifier (if available)
    pub bedrock_global_id: Option<&'static str>,

    /// Minimum number of tokens before a cache point for the prefix to be cached
    pub min_cache_tokens: u32,

    /// Cost per million input tokens (USD)
    pub cost_per_mtok_input: f64,

    /// Cost per million output tokens (USD)
    pub cost_per_mtok_output: f64,
}

/// AWS Bedrock endpoint region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BedrockRegion {
    /// Standard regional endpoint (tied to specific AWS region)
    Standard,
    /// Global endpoint (dynamic routing for maximum availability)
    Global,
    /// US cross-region inference profile
    US,
    /// EU cross-region inference profile
    EU,
    /// Asia-Pacific cross-region inference profile
    AsiaPacific,
}

impl BedrockRegion {
    const PREFIXED: [BedrockRegion; 4] = [
        BedrockRegion::Global,
        BedrockRegion::US,
        BedrockRegion::EU,
        BedrockRegion::AsiaPacific,
    ];

    /// Get the prefix for this region
    pub fn prefix(&self) -> &'static str {
        match self {
            BedrockRegion::Standard => "",
            BedrockRegion::Global => "global.",
            BedrockRegion::US => "us.",
            BedrockRegion::EU => "eu.",
            BedrockRegion::AsiaPacific => "ap.",
        }
    }

    /// Split an inference-profile id into its region and base model id
    pub fn split(id: &str) -> (BedrockRegion, &str) {
        Self::PREFIXED
            .iter()
            .find_map(|region| id.strip_prefix(region.prefix()).map(|base| (*region, base)))
            .unwrap_or((BedrockRegion::Standard, id))
    }
}

impl Model {
    /// Get the model ID for AWS Bedrock with a specific region prefix
    ///
    /// # Example
    ///
    /// ```rust
    /// use bedrock_cache_bench::models::{CLAUDE_HAIKU_3_5, BedrockRegion};
    ///
    /// assert_eq!(
    ///     CLAUDE_HAIKU_3_5.bedrock_id_for_region(BedrockRegion::US),
    ///     "us.anthropic.claude-3-5-haiku-20241022-v1:0"
    /// );
    /// ```
    pub fn bedrock_id_for_region(&self, region: BedrockRegion) -> String {
        format!("{}{}", region.prefix(), self.bedrock_id)
    }

    /// Whether an estimated prefix is long enough to be cached
    pub fn can_cache(&self, prefix_tokens: usize) -> bool {
        prefix_tokens >= self.min_cache_tokens as usize
    }

    /// Estimate the cost of one call, pricing cache reads and writes separately
    pub fn estimate_cost(&self, usage: &Usage) -> f64 {
        let per_input = self.cost_per_mtok_input / 1_000_000.0;
        let per_output = self.cost_per_mtok_output / 1_000_000.0;

        let written = usage.cache_write_input_tokens.unwrap_or(0) as f64;
        let read = usage.cache_read_input_tokens.unwrap_or(0) as f64;

        usage.input_tokens as f64 * per_input
            + written * per_input * CACHE_WRITE_MULTIPLIER
            + read * per_input * CACHE_READ_MULTIPLIER
            + usage.output_tokens as f64 * per_output
    }
}

/// Claude Sonnet 4.5 (2025-09-29)
pub const CLAUDE_SONNET_4_5: Model = Model {
    name: "Claude Sonnet 4.5",
    anthropic_id: "claude-sonnet-4-5-20250929",
    bedrock_id: "anthropic.claude-sonnet-4-5-20250929-v1:0",
    bedrock_global_id: Some("global.anthropic.claude-sonnet-4-5-20250929-v1:0"),
    min_cache_tokens: 1_024,
    cost_per_mtok_input: 3.0,
    cost_per_mtok_output: 15.0,
};

/// Claude Haiku 4.5 (2025-10-01)
pub const CLAUDE_HAIKU_4_5: Model = Model {
    name: "Claude Haiku 4.5",
    anthropic_id: "claude-haiku-4-5-20251001",
    bedrock_id: "anthropic.claude-haiku-4-5-20251001-v1:0",
    bedrock_global_id: Some("global.anthropic.claude-haiku-4-5-20251001-v1:0"),
    min_cache_tokens: 4_096,
    cost_per_mtok_input: 1.0,
    cost_per_mtok_output: 5.0,
};

/// Claude Opus 4.5 (2025-11-01)
pub const CLAUDE_OPUS_4_5: Model = Model {
    name: "Claude Opus 4.5",
    anthropic_id: "claude-opus-4-5-20251101",
    bedrock_id: "anthropic.claude-opus-4-5-20251101-v1:0",
    bedrock_global_id: Some("global.anthropic.claude-opus-4-5-20251101-v1:0"),
    min_cache_tokens: 4_096,
    cost_per_mtok_input: 5.0,
    cost_per_mtok_output: 25.0,
};

/// Claude Sonnet 4 (2025-05-14)
pub const CLAUDE_SONNET_4: Model = Model {
    name: "Claude Sonnet 4",
    anthropic_id: "claude-sonnet-4-20250514",
    bedrock_id: "anthropic.claude-sonnet-4-20250514-v1:0",
    bedrock_global_id: None,
    min_cache_tokens: 1_024,
    cost_per_mtok_input: 3.0,
    cost_per_mtok_output: 15.0,
};

/// Claude Sonnet 3.7 (2025-02-19)
pub const CLAUDE_SONNET_3_7: Model = Model {
    name: "Claude Sonnet 3.7",
    anthropic_id: "claude-3-7-sonnet-20250219",
    bedrock_id: "anthropic.claude-3-7-sonnet-20250219-v1:0",
    bedrock_global_id: None,
    min_cache_tokens: 1_024,
    cost_per_mtok_input: 3.0,
    cost_per_mtok_output: 15.0,
};

/// Claude Haiku 3.5 (2024-10-22)
pub const CLAUDE_HAIKU_3_5: Model = Model {
    name: "Claude Haiku 3.5",
    anthropic_id: "claude-3-5-haiku-20241022",
    bedrock_id: "anthropic.claude-3-5-haiku-20241022-v1:0",
    bedrock_global_id: None,
    min_cache_tokens: 2_048,
    cost_per_mtok_input: 0.80,
    cost_per_mtok_output: 4.0,
};

/// Models that support prompt caching on Bedrock (latest first)
pub const ALL_MODELS: &[&Model] = &[
    &CLAUDE_SONNET_4_5,
    &CLAUDE_HAIKU_4_5,
    &CLAUDE_OPUS_4_5,
    &CLAUDE_SONNET_4,
    &CLAUDE_SONNET_3_7,
    &CLAUDE_HAIKU_3_5,
];

/// Lookup a model by its Anthropic API ID
pub fn get_model_by_anthropic_id(id: &str) -> Option<&'static Model> {
    ALL_MODELS.iter().find(|m| m.anthropic_id == id).copied()
}

/// Lookup a model by its Bedrock ID (any region prefix)
pub fn get_model_by_bedrock_id(id: &str) -> Option<&'static Model> {
    let (_, base_id) = BedrockRegion::split(id);
    ALL_MODELS
        .iter()
        .find(|m| m.bedrock_id == base_id || m.bedrock_global_id == Some(id))
        .copied()
}

/// Lookup a model by any ID (tries Anthropic, then Bedrock)
pub fn get_model(id: &str) -> Option<&'static Model> {
    get_model_by_anthropic_id(id).or_else(|| get_model_by_bedrock_id(id))
}
