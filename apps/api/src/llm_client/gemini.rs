//! Gemini `generateContent` backend for `GenerationService`.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::llm_client::{CallError, GenerationRequest, GenerationService};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const RESOURCE_EXHAUSTED: &str = "RESOURCE_EXHAUSTED";

/// Everything the client needs, passed explicitly at construction.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: RequestContent<'a>,
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'a str,
    response_schema: &'a Value,
}

impl<'a> From<&GenerationRequest<'a>> for GenerateContentRequest<'a> {
    fn from(request: &GenerationRequest<'a>) -> Self {
        Self {
            system_instruction: RequestContent {
                role: None,
                parts: vec![RequestPart {
                    text: request.system_instruction,
                }],
            },
            contents: vec![RequestContent {
                role: Some("user"),
                parts: vec![RequestPart {
                    text: request.user_message,
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: request.response_schema,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, with all of its text parts joined.
    fn into_text(self) -> Result<String, CallError> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| CallError::Transient("Gemini returned no candidates".to_string()))?;

        let finish_reason = candidate.finish_reason.unwrap_or_default();
        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(CallError::Transient(format!(
                "Gemini returned empty content (finish reason: {finish_reason})"
            )));
        }
        Ok(text)
    }
}

/// Google API error envelope: `{"error": {"code", "message", "status"}}`.
#[derive(Debug, Deserialize)]
struct GoogleError {
    error: GoogleErrorBody,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Maps a non-success HTTP response to a `CallError` kind.
fn classify_failure(status: StatusCode, body: &str) -> CallError {
    let parsed = serde_json::from_str::<GoogleError>(body).ok();
    let api_status = parsed
        .as_ref()
        .map(|e| e.error.status.as_str())
        .unwrap_or_default();
    let detail = parsed
        .as_ref()
        .map(|e| e.error.message.as_str())
        .filter(|m| !m.is_empty())
        .unwrap_or(body.trim());
    let message = format!("{} {}", status.as_u16(), detail);

    if status == StatusCode::TOO_MANY_REQUESTS || api_status == RESOURCE_EXHAUSTED {
        CallError::RateLimited(message)
    } else if status.is_server_error() {
        CallError::Transient(message)
    } else {
        CallError::Fatal(message)
    }
}

/// Gemini REST client. Cheap to clone; the inner `reqwest::Client` is pooled.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl GenerationService for GeminiClient {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, CallError> {
        let body = GenerateContentRequest::from(request);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CallError::Transient(format!("request to Gemini failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CallError::Transient(format!("failed to read Gemini response: {e}")))?;

        if !status.is_success() {
            let err = classify_failure(status, &text);
            warn!("Gemini API returned {status}: {err:?}");
            return Err(err);
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|e| CallError::Transient(format!("undecodable Gemini response: {e}")))?;

        if let Some(usage) = &parsed.usage_metadata {
            debug!(
                "Gemini call succeeded: prompt_tokens={:?}, output_tokens={:?}",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }

        parsed.into_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, routing::post, Json, Router};
    use serde_json::json;

    type AxumStatus = axum::http::StatusCode;

    fn request_fixture(schema: &Value) -> GenerationRequest<'_> {
        GenerationRequest {
            system_instruction: "be an ATS",
            user_message: "Job Description: x\n\nResume Text: y",
            response_schema: schema,
        }
    }

    /// Serves `reply` for every generateContent call on an ephemeral port.
    async fn fake_gemini(status: u16, reply: Value) -> String {
        let status = AxumStatus::from_u16(status).unwrap();
        let app = Router::new().route(
            "/v1beta/models/:model_call",
            post(move |headers: HeaderMap| {
                let reply = reply.clone();
                async move {
                    let key = headers.get("x-goog-api-key").and_then(|v| v.to_str().ok());
                    if key != Some("k") {
                        return (
                            AxumStatus::UNAUTHORIZED,
                            Json(json!({"error": {"message": "no key"}})),
                        );
                    }
                    (status, Json(reply))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client_for(base_url: String) -> GeminiClient {
        GeminiClient::new(GeminiConfig {
            api_key: "k".to_string(),
            model: "gemini-2.5-flash".to_string(),
            base_url,
        })
        .unwrap()
    }

    #[test]
    fn test_request_body_uses_gemini_field_names() {
        let schema = json!({"type": "OBJECT"});
        let request = request_fixture(&schema);
        let body = serde_json::to_value(GenerateContentRequest::from(&request)).unwrap();

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be an ATS");
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn test_classify_429_is_rate_limited() {
        let err = classify_failure(StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert_eq!(err, CallError::RateLimited("429 slow down".to_string()));
    }

    #[test]
    fn test_classify_resource_exhausted_status_is_rate_limited() {
        let body = r#"{"error": {"code": 403, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#;
        let err = classify_failure(StatusCode::FORBIDDEN, body);
        assert_eq!(err, CallError::RateLimited("403 Quota exceeded".to_string()));
    }

    #[test]
    fn test_classify_5xx_is_transient() {
        let err = classify_failure(StatusCode::SERVICE_UNAVAILABLE, "");
        assert!(matches!(err, CallError::Transient(_)));
    }

    #[test]
    fn test_classify_invalid_key_is_fatal() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}}"#;
        let err = classify_failure(StatusCode::BAD_REQUEST, body);
        assert_eq!(err, CallError::Fatal("400 API key not valid.".to_string()));
    }

    #[test]
    fn test_into_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"parts": [{"text": "{\"a\":"}, {"text": "1}"}]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(response.into_text().unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_into_text_without_candidates_is_transient() {
        let response: GenerateContentResponse =
            serde_json::from_value(json!({"promptFeedback": {"blockReason": "SAFETY"}})).unwrap();
        assert!(matches!(
            response.into_text(),
            Err(CallError::Transient(_))
        ));
    }

    #[tokio::test]
    async fn test_generate_returns_candidate_text() {
        let base = fake_gemini(
            200,
            json!({
                "candidates": [{"content": {"role": "model", "parts": [{"text": "{\"ok\":true}"}]}}],
                "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 3}
            }),
        )
        .await;
        let schema = json!({});
        let text = client_for(base)
            .generate(&request_fixture(&schema))
            .await
            .unwrap();
        assert_eq!(text, "{\"ok\":true}");
    }

    #[tokio::test]
    async fn test_generate_maps_429_to_rate_limited() {
        let base = fake_gemini(
            429,
            json!({"error": {"code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED"}}),
        )
        .await;
        let schema = json!({});
        let err = client_for(base)
            .generate(&request_fixture(&schema))
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::RateLimited(_)));
    }

    #[tokio::test]
    async fn test_generate_unreachable_host_is_transient() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let schema = json!({});
        let err = client_for(format!("http://{addr}"))
            .generate(&request_fixture(&schema))
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::Transient(_)));
    }
}
