//! Prompt caching benchmark against AWS Bedrock
//!
//! Sends two requests sharing a large cached system prefix and prints the
//! latency and token usage of each. Credentials come from the standard AWS
//! chain (AWS_PROFILE, AWS_ACCESS_KEY_ID, ...).
//!
//! Run with:
//! ```bash
//! RUST_LOG=info cargo run --bin cache-bench
//! ```

use bedrock_cache_bench::{run, BenchConfig, ModelClient, Reporter, RunOutcome};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so stdout stays the report
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = BenchConfig::default();
    config.validate()?;

    let client = ModelClient::bedrock(&config.region).await?;
    let mut reporter = Reporter::stdio();

    // A failed call has already been reported; the process still exits cleanly
    match run(&client, &config, &mut reporter).await? {
        RunOutcome::Completed { .. } => tracing::debug!("benchmark completed"),
        RunOutcome::FirstFailed(_) | RunOutcome::SecondFailed { .. } => {
            tracing::debug!("benchmark stopped early")
        }
    }

    Ok(())
}
