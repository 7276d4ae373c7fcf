//! Axum route handler for the Analysis API.

use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use tracing::info;

use crate::analysis::models::{AnalysisOutcome, AnalysisRequest};
use crate::errors::AppError;
use crate::state::AppState;

const MISSING_INPUT: &str = "Missing Job Description or Resume file";
const MISSING_API_KEY: &str = "API Key not configured. Set GEMINI_API_KEY and restart the server.";

/// Fields read from the `/analyze` form. Unknown fields are ignored.
#[derive(Debug, Default)]
struct AnalyzeForm {
    job_description: Option<String>,
    resume: Option<Bytes>,
}

impl AnalyzeForm {
    async fn read(multipart: &mut Multipart) -> Result<Self, AppError> {
        let mut form = AnalyzeForm::default();
        while let Some(field) = multipart.next_field().await.map_err(invalid_form)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "jd" => form.job_description = Some(field.text().await.map_err(invalid_form)?),
                // Only file parts count as the résumé, not a plain text field.
                "resume" if field.file_name().is_some() => {
                    form.resume = Some(field.bytes().await.map_err(invalid_form)?)
                }
                _ => {}
            }
        }
        Ok(form)
    }

    /// Both inputs, or `None` if either is absent or empty.
    fn into_inputs(self) -> Option<(String, Bytes)> {
        let job_description = self.job_description.filter(|jd| !jd.trim().is_empty())?;
        let resume = self.resume.filter(|r| !r.is_empty())?;
        Some((job_description, resume))
    }
}

fn invalid_form(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(format!("Invalid multipart form: {e}"))
}

/// POST /analyze
///
/// Multipart fields: `jd` (text) and `resume` (PDF file).
/// Input and extraction failures map to 400 / 500. Analysis failures are returned
/// as `{"error": ...}` with a 200.
pub async fn handle_analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisOutcome>, AppError> {
    let analyzer = state
        .analyzer
        .clone()
        .ok_or_else(|| AppError::Configuration(MISSING_API_KEY.to_string()))?;

    let (job_description, resume) = AnalyzeForm::read(&mut multipart)
        .await?
        .into_inputs()
        .ok_or_else(|| AppError::Validation(MISSING_INPUT.to_string()))?;

    // CPU-bound PDF parsing runs on the blocking pool.
    let extractor = state.extractor.clone();
    let resume_bytes = resume.len();
    let resume_text = tokio::task::spawn_blocking(move || extractor.extract(&resume))
        .await
        .map_err(|e| {
            AppError::Internal(anyhow::anyhow!(
                "spawn_blocking failed in PDF extraction: {e}"
            ))
        })??;

    info!(
        "Analyzing resume ({resume_bytes} bytes, {} chars extracted) against JD ({} chars)",
        resume_text.chars().count(),
        job_description.chars().count()
    );

    let outcome = analyzer
        .analyze(&AnalysisRequest {
            job_description,
            resume_text,
        })
        .await;
    info!("Analysis finished (success: {})", outcome.is_success());

    Ok(Json(outcome))
}
