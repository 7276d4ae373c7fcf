// Prompt and response-schema constants for the ATS analysis call.

use serde_json::{json, Value};

/// System instruction sent with every analysis request.
pub const ATS_SYSTEM: &str = "You are an expert Technical Recruiter and ATS (Applicant Tracking System). \
    Your task is to analyze the provided Resume Text against a Job Description. \
    Compare them based on skills, experience, and tools. \
    You must respond ONLY with a JSON object.";

/// User turn: the job description first, then the résumé text.
pub fn build_user_message(job_description: &str, resume_text: &str) -> String {
    format!("Job Description: {job_description}\n\nResume Text: {resume_text}")
}

/// Gemini response schema (OpenAPI subset). `strengths` is the only optional field.
pub fn analysis_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "match_percentage": {"type": "INTEGER"},
            "matching_skills": {"type": "ARRAY", "items": {"type": "STRING"}},
            "missing_skills": {"type": "ARRAY", "items": {"type": "STRING"}},
            "strengths": {"type": "STRING"},
            "suggestions": {"type": "STRING"}
        },
        "required": ["match_percentage", "matching_skills", "missing_skills", "suggestions"]
    })
}
