// Résumé vs job-description match analysis.
// Implements: ATS prompt + response schema, retry/backoff client, POST /analyze handler.
// All model calls go through llm_client::GenerationService.

pub mod client;
pub mod handlers;
pub mod models;
pub mod prompts;

pub use client::{AnalysisClient, RetryPolicy};
pub use models::{AnalysisOutcome, AnalysisRequest, AnalysisResult, ErrorResult};
