//! LLM Client: the single point of entry for all generative-model calls.
//!
//! ARCHITECTURAL RULE: No other module may call the Gemini API directly.
//! Callers depend on the `GenerationService` trait; `GeminiClient` is the production backend.
//!
//! Retrying is NOT done here. A service reports one attempt's outcome as a `CallError`
//! kind and the caller owns the retry policy.
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub mod gemini;

pub use gemini::{GeminiClient, GeminiConfig};

/// Outcome kinds of a failed generation attempt. Retry decisions branch on the kind only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// Quota exhausted or HTTP 429.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Network failure, 5xx, or an unusable response body. Worth another attempt.
    #[error("{0}")]
    Transient(String),

    /// Rejected request (bad credential, invalid argument, unknown model).
    /// Retried on the same 1s schedule as `Transient`.
    #[error("{0}")]
    Fatal(String),
}

/// One schema-constrained generation call: instruction, user turn, and the JSON
/// schema the output must follow.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub system_instruction: &'a str,
    pub user_message: &'a str,
    pub response_schema: &'a Value,
}

#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Performs a single attempt and returns the raw JSON text produced by the model.
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, CallError>;
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => {
            let stripped = stripped.trim_start();
            stripped
                .strip_suffix("```")
                .map(str::trim)
                .unwrap_or(stripped)
        }
        None => text,
    }
}
