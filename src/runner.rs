//! The two-request prompt caching benchmark
//!
//! Request 1 sends a large system prefix ending in a cache point, which makes
//! the service write the prefix to its cache. Request 2 reuses the very same
//! [`SystemContent`] with a different question, so its prefix matches byte for
//! byte and should be served from the cache. The runner times both calls and
//! prints what the service reports.
//!
//! # Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "bedrock")]
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use bedrock_cache_bench::{runner, BenchConfig, ModelClient, Reporter};
//!
//! let config = BenchConfig::default();
//! let client = ModelClient::bedrock(&config.region).await?;
//! let outcome = runner::run(&client, &config, &mut Reporter::stdio()).await?;
//! println!("completed: {}", outcome.is_completed());
//! # Ok(())
//! # }
//! ```

use crate::client::InferenceClient;
use crate::config::BenchConfig;
use crate::error::{Error, Result};
use crate::models;
use crate::report::Reporter;
use crate::tokens::TokenCounter;
use crate::types::{ContentBlock, ConverseRequest, ConverseResponse, Message, SystemContent};
use std::io::Write;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

pub const FIRST_LABEL: &str = "Request 1";
pub const SECOND_LABEL: &str = "Request 2";

/// One timed call that succeeded
#[derive(Debug, Clone)]
pub struct CallReport {
    pub label: &'static str,
    /// Wall-clock time from send to complete response
    pub latency: Duration,
    pub response: ConverseResponse,
}

/// How far a run got
#[derive(Debug)]
pub enum RunOutcome {
    /// Both calls succeeded
    Completed {
        first: CallReport,
        second: CallReport,
    },
    /// Request 1 failed; Request 2 was never sent
    FirstFailed(Error),
    /// Request 1 succeeded and Request 2 failed
    SecondFailed { first: CallReport, error: Error },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }
}

/// Build the system content shared by both requests.
///
/// One text block holding the instructions followed by the repeated filler,
/// then a cache point. The result is deterministic for a given config.
pub fn build_system_content(config: &BenchConfig) -> SystemContent {
    let mut text = String::with_capacity(
        config.instruction_prefix.len() + config.filler_sentence.len() * config.filler_repeat,
    );
    text.push_str(&config.instruction_prefix);
    text.push_str(&config.filler_sentence.repeat(config.filler_repeat));

    SystemContent::new(vec![ContentBlock::Text(text), ContentBlock::cache_point()])
}

/// First user message, ending in its own cache point
pub fn first_message(config: &BenchConfig) -> Message {
    Message::user_blocks(vec![
        ContentBlock::text(&config.first_prompt),
        ContentBlock::cache_point(),
    ])
}

/// Second user message, without a cache point
pub fn second_message(config: &BenchConfig) -> Message {
    Message::user(&config.second_prompt)
}

/// Send one request and time it.
///
/// Both call sites use this and decide from the returned `Result` whether
/// the run goes on.
pub async fn timed_call<C>(
    client: &C,
    label: &'static str,
    request: &ConverseRequest,
) -> Result<CallReport>
where
    C: InferenceClient + ?Sized,
{
    let start = Instant::now();
    let result = client.converse(request).await;
    let latency = start.elapsed();

    match result {
        Ok(response) => {
            info!(
                label,
                latency_ms = latency.as_millis() as u64,
                has_usage = response.usage.is_some(),
                "call completed"
            );
            Ok(CallReport {
                label,
                latency,
                response,
            })
        }
        Err(error) => {
            warn!(label, latency_ms = latency.as_millis() as u64, %error, "call failed");
            Err(error)
        }
    }
}

/// Estimate the cacheable prefix and say whether the model will cache it.
///
/// A short prefix is reported, not rejected: the cache point is still sent.
fn check_prefix<O: Write, E: Write>(
    config: &BenchConfig,
    system: &SystemContent,
    reporter: &mut Reporter<O, E>,
) -> Result<()> {
    let counter = match TokenCounter::new() {
        Ok(counter) => counter,
        Err(error) => {
            warn!(%error, "skipping cached prefix estimate");
            return Ok(());
        }
    };

    let tokens = counter.count_cacheable_prefix(system);
    let model = models::get_model(&config.model_id);
    match model {
        Some(model) if !model.can_cache(tokens) => warn!(
            tokens,
            minimum = model.min_cache_tokens,
            model = model.name,
            "cached prefix is below the model minimum and will not be cached"
        ),
        Some(_) => debug!(tokens, "cached prefix estimate"),
        None => debug!(
            tokens,
            model_id = %config.model_id,
            "no caching metadata for model"
        ),
    }
    reporter.prefix_estimate(tokens, model)
}

/// Print a failed call on the error stream.
///
/// The call error is the result of the run, so a broken error stream is only
/// logged and never replaces it.
fn report_failure<O: Write, E: Write>(
    reporter: &mut Reporter<O, E>,
    label: &str,
    error: &Error,
) {
    let written = reporter.failure(label, error).and_then(|()| reporter.flush());
    if let Err(write_error) = written {
        warn!(label, %error, %write_error, "could not report call failure");
    }
}

/// Run the benchmark: Request 1 to fill the cache, then Request 2 to read it.
///
/// Call failures are reported and end the run but are not returned as
/// errors; they show up in the [`RunOutcome`]. `Err` means the report itself
/// could not be written.
#[instrument(skip_all, fields(model = %config.model_id))]
pub async fn run<C, O, E>(
    client: &C,
    config: &BenchConfig,
    reporter: &mut Reporter<O, E>,
) -> Result<RunOutcome>
where
    C: InferenceClient + ?Sized,
    O: Write,
    E: Write,
{
    debug!(config = %serde_json::to_string(config)?, "starting benchmark");
    reporter.line("Generating large context...")?;
    let system = build_system_content(config);
    check_prefix(config, &system, reporter)?;

    let first_request =
        ConverseRequest::new(&config.model_id, vec![first_message(config)], system.clone())
            .with_max_tokens(config.max_tokens);

    reporter.header(FIRST_LABEL, "Creating Cache")?;
    let first = match timed_call(client, FIRST_LABEL, &first_request).await {
        Ok(report) => report,
        Err(error) => {
            report_failure(reporter, FIRST_LABEL, &error);
            return Ok(RunOutcome::FirstFailed(error));
        }
    };
    reporter.latency(first.latency)?;
    reporter.response(&first.response)?;

    // Same allocation as request 1, so the prefix cannot drift
    let second_request = ConverseRequest::new(&config.model_id, vec![second_message(config)], system)
        .with_max_tokens(config.max_tokens);

    reporter.header(SECOND_LABEL, "Using Cache")?;
    let second = match timed_call(client, SECOND_LABEL, &second_request).await {
        Ok(report) => report,
        Err(error) => {
            report_failure(reporter, SECOND_LABEL, &error);
            return Ok(RunOutcome::SecondFailed { first, error });
        }
    };
    reporter.latency(second.latency)?;
    reporter.response(&second.response)?;

    reporter.summary(
        (first.latency, first.response.usage.as_ref()),
        (second.latency, second.response.usage.as_ref()),
        models::get_model(&config.model_id),
    )?;
    reporter.flush()?;

    Ok(RunOutcome::Completed { first, second })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CLAUDE_HAIKU_3_5;
    use crate::types::Usage;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Client that answers from a script and records every request
    struct ScriptedClient {
        replies: Mutex<VecDeque<Result<ConverseResponse>>>,
        requests: Mutex<Vec<ConverseRequest>>,
    }

    impl ScriptedClient {
        fn new(replies: Vec<Result<ConverseResponse>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn requests(&self) -> Vec<ConverseRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl InferenceClient for ScriptedClient {
        async fn converse(&self, request: &ConverseRequest) -> Result<ConverseResponse> {
            self.requests.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(Error::Service {
                        status: None,
                        message: "no scripted reply".into(),
                    })
                })
        }
    }

    fn reply(usage: Option<Usage>) -> Result<ConverseResponse> {
        Ok(ConverseResponse {
            content: vec![ContentBlock::text("The reference text repeats one sentence.")],
            stop_reason: Some("end_turn".into()),
            usage,
            server_latency_ms: None,
        })
    }

    fn small_config() -> BenchConfig {
        BenchConfig::default().with_filler_repeat(50)
    }

    async fn run_scripted(
        config: &BenchConfig,
        client: &ScriptedClient,
    ) -> (RunOutcome, String, String) {
        let mut reporter = Reporter::new(Vec::new(), Vec::new());
        let outcome = run(client, config, &mut reporter).await.unwrap();
        let (out, err) = reporter.into_inner();
        (
            outcome,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    /// Writer whose every write fails, like a closed stderr
    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    /// Assert that `needles` occur in `haystack` in the given order
    fn assert_in_order(haystack: &str, needles: &[&str]) {
        let mut from = 0;
        for needle in needles {
            match haystack[from..].find(needle) {
                Some(pos) => from += pos + needle.len(),
                None => panic!("{:?} not found in order in:\n{}", needle, haystack),
            }
        }
    }

    #[test]
    fn test_system_content_shape() {
        let config = small_config();
        let system = build_system_content(&config);

        assert_eq!(system.blocks().len(), 2);
        assert!(system.ends_with_cache_point());

        let text = system.blocks()[0].as_text().unwrap();
        assert!(text.starts_with(&config.instruction_prefix));
        assert_eq!(
            text.len(),
            config.instruction_prefix.len() + config.filler_sentence.len() * 50
        );
    }

    #[test]
    fn test_system_content_is_deterministic() {
        let config = small_config();
        assert_eq!(build_system_content(&config), build_system_content(&config));
    }

    #[test]
    fn test_messages_differ_in_cache_point() {
        let config = BenchConfig::default();
        let first = first_message(&config);
        let second = second_message(&config);

        assert!(first.content.last().unwrap().is_cache_point());
        assert!(!second.content.iter().any(ContentBlock::is_cache_point));
        assert_ne!(first, second);
    }

    #[test]
    fn test_default_filler_exceeds_cache_minimum() {
        let config = BenchConfig::default();
        let counter = TokenCounter::new().unwrap();
        let tokens = counter.count_cacheable_prefix(&build_system_content(&config));

        let model = models::get_model(&config.model_id).unwrap();
        assert!(model.can_cache(tokens));
        assert!(crate::models::ALL_MODELS.iter().all(|m| m.can_cache(tokens)));
    }

    #[test]
    fn test_boundary_filler_keeps_cache_point() {
        let counter = TokenCounter::new().unwrap();
        let minimum = CLAUDE_HAIKU_3_5.min_cache_tokens as usize;

        let mut repeat = 1;
        let mut config = BenchConfig::default().with_filler_repeat(repeat);
        while counter.count_cacheable_prefix(&build_system_content(&config)) < minimum {
            repeat += 1;
            config = config.with_filler_repeat(repeat);
        }

        let at_boundary = build_system_content(&config);
        assert!(at_boundary.ends_with_cache_point());
        assert!(CLAUDE_HAIKU_3_5.can_cache(counter.count_cacheable_prefix(&at_boundary)));

        let just_below = build_system_content(&config.clone().with_filler_repeat(repeat - 1));
        assert!(just_below.ends_with_cache_point());
        assert!(!CLAUDE_HAIKU_3_5.can_cache(counter.count_cacheable_prefix(&just_below)));
    }

    #[tokio::test]
    async fn test_requests_share_identical_system_prefix() {
        let client = ScriptedClient::new(vec![reply(None), reply(None)]);
        let (outcome, _, _) = run_scripted(&small_config(), &client).await;
        assert!(outcome.is_completed());

        let requests = client.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].system.shares_with(&requests[1].system));

        let first = serde_json::to_value(&requests[0]).unwrap();
        let second = serde_json::to_value(&requests[1]).unwrap();
        assert_eq!(
            serde_json::to_string(&first["system"]).unwrap(),
            serde_json::to_string(&second["system"]).unwrap()
        );
        assert_ne!(first["messages"], second["messages"]);
    }

    #[tokio::test]
    async fn test_first_failure_skips_second_request() {
        let client = ScriptedClient::new(vec![
            Err(Error::Authentication("security token expired".into())),
            reply(None),
        ]);
        let (outcome, out, err) = run_scripted(&small_config(), &client).await;

        assert_eq!(client.calls(), 1);
        assert!(matches!(
            outcome,
            RunOutcome::FirstFailed(Error::Authentication(_))
        ));
        assert_eq!(
            err,
            "Error in Request 1: Authentication failed: security token expired\n"
        );
        assert!(out.contains("--- Request 1: Creating Cache ---"));
        assert!(!out.contains("Request 2"));
        assert!(!out.contains("Latency:"));
    }

    #[tokio::test]
    async fn test_call_error_survives_broken_error_stream() {
        let client = ScriptedClient::new(vec![Err(Error::Network("connection reset".into()))]);
        let mut reporter = Reporter::new(Vec::new(), BrokenPipe);

        let outcome = run(&client, &small_config(), &mut reporter).await.unwrap();
        match outcome {
            RunOutcome::FirstFailed(Error::Network(message)) => {
                assert_eq!(message, "connection reset")
            }
            other => panic!("Expected FirstFailed(Network), got {:?}", other),
        }
        assert_eq!(client.calls(), 1);

        let client = ScriptedClient::new(vec![
            reply(None),
            Err(Error::Authentication("token expired".into())),
        ]);
        let mut reporter = Reporter::new(Vec::new(), BrokenPipe);

        let outcome = run(&client, &small_config(), &mut reporter).await.unwrap();
        assert!(matches!(
            outcome,
            RunOutcome::SecondFailed {
                error: Error::Authentication(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_second_failure_is_reported() {
        let client = ScriptedClient::new(vec![
            reply(Some(Usage::new(5000, 20))),
            Err(Error::Throttled {
                retry_after: None,
                message: "Too many requests".into(),
            }),
        ]);
        let (outcome, out, err) = run_scripted(&small_config(), &client).await;

        assert_eq!(client.calls(), 2);
        match outcome {
            RunOutcome::SecondFailed { first, error } => {
                assert_eq!(first.label, FIRST_LABEL);
                assert!(matches!(error, Error::Throttled { .. }));
            }
            other => panic!("Expected SecondFailed, got {:?}", other),
        }
        assert_eq!(err, "Error in Request 2: Request throttled: Too many requests\n");
        assert!(out.contains("Input Tokens: 5000"));
        assert!(!out.contains("--- Summary ---"));
    }

    #[tokio::test]
    async fn test_missing_usage_skips_usage_lines() {
        let client = ScriptedClient::new(vec![reply(None), reply(None)]);
        let (outcome, out, err) = run_scripted(&small_config(), &client).await;

        assert!(outcome.is_completed());
        assert!(err.is_empty());
        assert!(!out.contains("Input Tokens"));
        assert!(!out.contains("Full Usage Info"));
        assert_eq!(out.matches("Response: ").count(), 2);
        assert!(!out.contains("Estimated Cost"));
    }

    #[tokio::test]
    async fn test_end_to_end_prints_both_calls_in_order() {
        let client = ScriptedClient::new(vec![
            reply(Some(Usage::new(5000, 20))),
            reply(Some(Usage::new(15, 10))),
        ]);
        let (outcome, out, err) = run_scripted(&small_config(), &client).await;

        assert!(outcome.is_completed());
        assert!(err.is_empty(), "unexpected error output: {}", err);
        assert_in_order(
            &out,
            &[
                "Generating large context...",
                "--- Request 1: Creating Cache ---",
                "Latency: ",
                "Input Tokens: 5000\n",
                "Output Tokens: 20\n",
                "Full Usage Info: {",
                "--- Request 2: Using Cache ---",
                "Latency: ",
                "Input Tokens: 15\n",
                "Output Tokens: 10\n",
                "Full Usage Info: {",
                "--- Summary ---",
            ],
        );
    }

    #[tokio::test]
    async fn test_cache_counters_are_printed_verbatim() {
        let mut written = Usage::new(4, 20);
        written.cache_write_input_tokens = Some(4988);
        let mut read = Usage::new(15, 10);
        read.cache_read_input_tokens = Some(4988);
        read.extra
            .insert("serviceTier".into(), serde_json::json!("standard"));

        let client = ScriptedClient::new(vec![reply(Some(written)), reply(Some(read))]);
        let (outcome, out, _) = run_scripted(&small_config(), &client).await;

        assert!(outcome.is_completed());
        assert_in_order(
            &out,
            &[
                "Cache Write Tokens: 4988",
                "\"cacheWriteInputTokens\": 4988",
                "Cache Read Tokens: 4988",
                "\"serviceTier\": \"standard\"",
            ],
        );
    }

    #[tokio::test]
    async fn test_short_prefix_still_sends_cache_point() {
        let client = ScriptedClient::new(vec![reply(None), reply(None)]);
        let config = BenchConfig::default().with_filler_repeat(1);
        let (outcome, out, _) = run_scripted(&config, &client).await;

        assert!(outcome.is_completed());
        assert!(out.contains("Note: cached prefix is ~"));
        assert!(client.requests()[0].system.ends_with_cache_point());
    }

    #[tokio::test]
    #[cfg(feature = "bedrock")]
    #[ignore] // Requires AWS credentials and model access
    async fn test_live_second_call_reads_cache() -> anyhow::Result<()> {
        let config = BenchConfig::default();
        let client = crate::client::ModelClient::bedrock(&config.region).await?;
        let mut reporter = Reporter::new(Vec::new(), Vec::new());

        match run(&client, &config, &mut reporter).await? {
            RunOutcome::Completed { second, .. } => {
                let usage = second
                    .response
                    .usage
                    .ok_or_else(|| anyhow::anyhow!("no usage on second call"))?;
                anyhow::ensure!(usage.cache_read_input_tokens.unwrap_or(0) > 0);
            }
            other => anyhow::bail!("benchmark did not complete: {:?}", other),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_timed_call_returns_response() {
        let client = ScriptedClient::new(vec![reply(Some(Usage::new(1, 2)))]);
        let request = ConverseRequest::new("m", vec![Message::user("q")], SystemContent::empty());

        let report = timed_call(&client, FIRST_LABEL, &request).await.unwrap();
        assert_eq!(report.label, FIRST_LABEL);
        assert_eq!(report.response.usage, Some(Usage::new(1, 2)));
    }
}
