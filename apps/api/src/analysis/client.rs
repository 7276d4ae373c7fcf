//! Analysis client. Drives the ATS generation call under a bounded retry policy.
//!
//! Per call the client moves through `ATTEMPTING(0) .. ATTEMPTING(max_attempts - 1)` and ends
//! in exactly one of SUCCESS (`AnalysisOutcome::Success`) or FAILED (`AnalysisOutcome::Failure`).
//!
//! Backoff by failure kind:
//! - `RateLimited`: `2^(attempt+1)` seconds (2s, 4s, 8s, 16s), no jitter
//! - `Transient`, `Fatal`, unparseable or out-of-schema payloads: 1s
//!
//! Delays use `tokio::time::sleep`, so dropping the request future aborts the loop.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{error, info, warn};

use crate::analysis::models::{AnalysisOutcome, AnalysisRequest, AnalysisResult, ErrorResult};
use crate::analysis::prompts::{analysis_response_schema, build_user_message, ATS_SYSTEM};
use crate::llm_client::{CallError, GenerationRequest, GenerationService};

pub const QUOTA_EXCEEDED_MESSAGE: &str = "Gemini API Quota Exceeded. Please wait a minute before trying again or check your billing settings.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after any failure that is not a rate limit.
    pub transient_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            transient_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay after a rate-limited attempt `attempt` (0-based): `2^(attempt+1)` seconds.
    pub fn rate_limit_delay(&self, attempt: u32) -> Duration {
        Duration::from_secs(2u64.saturating_pow(attempt.saturating_add(1)))
    }
}

/// Runs analyses against any `GenerationService`. Holds no per-request state.
#[derive(Clone)]
pub struct AnalysisClient {
    service: Arc<dyn GenerationService>,
    policy: RetryPolicy,
    response_schema: Value,
}

impl AnalysisClient {
    pub fn new(service: Arc<dyn GenerationService>, policy: RetryPolicy) -> Self {
        Self {
            service,
            policy,
            response_schema: analysis_response_schema(),
        }
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> AnalysisOutcome {
        let user_message = build_user_message(&request.job_description, &request.resume_text);
        let generation = GenerationRequest {
            system_instruction: ATS_SYSTEM,
            user_message: &user_message,
            response_schema: &self.response_schema,
        };

        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            let failure = match self.service.generate(&generation).await {
                Ok(text) => match AnalysisResult::from_model_output(&text) {
                    Ok(result) => {
                        info!(
                            "Analysis succeeded on attempt {}: match_percentage={}",
                            attempt + 1,
                            result.match_percentage
                        );
                        return AnalysisOutcome::Success(result);
                    }
                    Err(e) => CallError::Transient(e.to_string()),
                },
                Err(e) => e,
            };

            let is_last = attempt + 1 >= max_attempts;
            let delay = match &failure {
                CallError::RateLimited(msg) => {
                    if is_last {
                        error!("Analysis rate limited after {max_attempts} attempts: {msg}");
                        return AnalysisOutcome::Failure(ErrorResult::new(QUOTA_EXCEEDED_MESSAGE));
                    }
                    self.policy.rate_limit_delay(attempt)
                }
                CallError::Transient(msg) | CallError::Fatal(msg) => {
                    if is_last {
                        error!("Analysis failed after {max_attempts} attempts: {msg}");
                        return AnalysisOutcome::Failure(service_error(msg));
                    }
                    self.policy.transient_delay
                }
            };

            warn!(
                "Analysis attempt {} failed ({failure:?}), retrying after {}ms...",
                attempt + 1,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

fn service_error(message: &str) -> ErrorResult {
    ErrorResult::new(format!("AI service error: {message}"))
}
