//! Token estimates for cacheable prefixes
//!
//! Claude's tokenizer is not public, so counts use cl100k_base as an
//! approximation. The service's own `inputTokens` figure is authoritative;
//! these estimates only tell whether a prefix is plausibly long enough to be
//! cached before any request is sent.

use crate::error::{Error, Result};
use crate::types::{ContentBlock, SystemContent};
use tiktoken_rs::cl100k_base;

/// Token counter for request content
///
/// # Example
///
/// ```rust
/// use bedrock_cache_bench::tokens::TokenCounter;
///
/// let counter = TokenCounter::new().unwrap();
/// let tokens = counter.count_text("Hello, Claude!");
/// assert!(tokens > 0);
/// ```
pub struct TokenCounter {
    bpe: tiktoken_rs::CoreBPE,
}

impl TokenCounter {
    /// Create a new token counter backed by cl100k_base
    pub fn new() -> Result<Self> {
        let bpe = cl100k_base().map_err(|e| Error::Tokenizer(e.to_string()))?;
        Ok(Self { bpe })
    }

    /// Count tokens in a text string
    pub fn count_text(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }

    /// Count tokens in a content block. Cache points carry no tokens.
    pub fn count_content_block(&self, block: &ContentBlock) -> usize {
        match block {
            ContentBlock::Text(text) => self.count_text(text),
            ContentBlock::CachePoint(_) => 0,
        }
    }

    pub fn count_blocks(&self, blocks: &[ContentBlock]) -> usize {
        blocks.iter().map(|b| self.count_content_block(b)).sum()
    }

    /// Count the tokens that sit before the last cache point of the system content.
    ///
    /// Returns 0 when the system content has no cache point.
    pub fn count_cacheable_prefix(&self, system: &SystemContent) -> usize {
        let blocks = system.blocks();
        match blocks.iter().rposition(ContentBlock::is_cache_point) {
            Some(end) => self.count_blocks(&blocks[..end]),
            None => 0,
        }
    }
}
