use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm_client::strip_json_fences;

/// Input of one analysis. Built per request and dropped when the response is sent.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub job_description: String,
    pub resume_text: String,
}

/// Structured match analysis returned by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub match_percentage: u32, // 0 – 100
    pub matching_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strengths: Option<String>,
    pub suggestions: String,
}

/// Uniform error body: `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResult {
    pub error: String,
}

impl ErrorResult {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// What `/analyze` returns with a 200: either shape, untagged on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisOutcome {
    Success(AnalysisResult),
    Failure(ErrorResult),
}

impl AnalysisOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisOutcome::Success(_))
    }
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("response is not valid analysis JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("match_percentage {0} is outside 0-100")]
    OutOfRange(u32),
}

impl AnalysisResult {
    /// Parses the model's text output and checks the fields the schema cannot express.
    pub fn from_model_output(text: &str) -> Result<Self, PayloadError> {
        let result: AnalysisResult = serde_json::from_str(strip_json_fences(text))?;
        if result.match_percentage > 100 {
            return Err(PayloadError::OutOfRange(result.match_percentage));
        }
        Ok(result)
    }
}
