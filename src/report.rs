//! Console report for a benchmark run
//!
//! Results go to one writer and errors to another, so a run that prints to
//! stdout/stderr can be captured in memory by tests.

use crate::error::{Error, Result};
use crate::models::Model;
use crate::types::{ConverseResponse, Usage};
use std::io::Write;
use std::time::Duration;

/// Characters of generated text shown per response
const PREVIEW_CHARS: usize = 100;

pub struct Reporter<O, E> {
    out: O,
    err: E,
}

impl Reporter<std::io::Stdout, std::io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdout(), std::io::stderr())
    }
}

impl<O: Write, E: Write> Reporter<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self { out, err }
    }

    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }

    pub fn line(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{}", text)?;
        Ok(())
    }

    pub fn prefix_estimate(&mut self, tokens: usize, model: Option<&Model>) -> Result<()> {
        match model {
            Some(model) if !model.can_cache(tokens) => writeln!(
                self.out,
                "Note: cached prefix is ~{} tokens, below the {} token minimum for {}",
                tokens, model.min_cache_tokens, model.name
            )?,
            Some(model) => writeln!(
                self.out,
                "Cached prefix: ~{} tokens (minimum {} for {})",
                tokens, model.min_cache_tokens, model.name
            )?,
            None => writeln!(self.out, "Cached prefix: ~{} tokens", tokens)?,
        }
        Ok(())
    }

    pub fn header(&mut self, label: &str, purpose: &str) -> Result<()> {
        writeln!(self.out, "\n--- {}: {} ---", label, purpose)?;
        Ok(())
    }

    pub fn latency(&mut self, latency: Duration) -> Result<()> {
        writeln!(self.out, "Latency: {:.2}s", latency.as_secs_f64())?;
        Ok(())
    }

    /// Print the usage counters, then the full usage object as pretty JSON
    pub fn usage(&mut self, usage: &Usage) -> Result<()> {
        writeln!(self.out, "Input Tokens: {}", usage.input_tokens)?;
        writeln!(self.out, "Output Tokens: {}", usage.output_tokens)?;
        if let Some(read) = usage.cache_read_input_tokens {
            writeln!(self.out, "Cache Read Tokens: {}", read)?;
        }
        if let Some(written) = usage.cache_write_input_tokens {
            writeln!(self.out, "Cache Write Tokens: {}", written)?;
        }
        writeln!(
            self.out,
            "Full Usage Info: {}",
            serde_json::to_string_pretty(usage)?
        )?;
        Ok(())
    }

    pub fn response(&mut self, response: &ConverseResponse) -> Result<()> {
        if let Some(ms) = response.server_latency_ms {
            writeln!(self.out, "Server Latency: {}ms", ms)?;
        }
        if let Some(usage) = &response.usage {
            self.usage(usage)?;
        }

        let text = response.text();
        if !text.is_empty() {
            let preview: String = text.chars().take(PREVIEW_CHARS).collect();
            let ellipsis = if text.chars().count() > PREVIEW_CHARS {
                "..."
            } else {
                ""
            };
            writeln!(self.out, "Response: {}{}", preview.trim_end(), ellipsis)?;
        }
        Ok(())
    }

    /// Report a failed call on the error writer
    pub fn failure(&mut self, label: &str, error: &Error) -> Result<()> {
        writeln!(self.err, "Error in {}: {}", label, error)?;
        Ok(())
    }

    /// Compare the two calls once both have succeeded
    pub fn summary(
        &mut self,
        first: (Duration, Option<&Usage>),
        second: (Duration, Option<&Usage>),
        model: Option<&Model>,
    ) -> Result<()> {
        writeln!(self.out, "\n--- Summary ---")?;

        let (before, after) = (first.0.as_secs_f64(), second.0.as_secs_f64());
        write!(self.out, "Latency: {:.2}s -> {:.2}s", before, after)?;
        if before > 0.0 {
            let change = (before - after) / before * 100.0;
            if change >= 0.0 {
                writeln!(self.out, " ({:.1}% faster)", change)?;
            } else {
                writeln!(self.out, " ({:.1}% slower)", -change)?;
            }
        } else {
            writeln!(self.out)?;
        }

        if let (Some(model), Some(u1), Some(u2)) = (model, first.1, second.1) {
            writeln!(
                self.out,
                "Estimated Cost: ${:.6} -> ${:.6}",
                model.estimate_cost(u1),
                model.estimate_cost(u2)
            )?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        self.err.flush()?;
        Ok(())
    }
}
