use std::sync::Arc;

use crate::analysis::AnalysisClient;
use crate::config::Config;
use crate::extraction::TextExtractor;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Pluggable résumé extractor. Default: PdfTextExtractor.
    pub extractor: Arc<dyn TextExtractor>,
    /// `None` when no Gemini API key is configured; `/analyze` then answers with a
    /// configuration error instead of failing at startup.
    pub analyzer: Option<Arc<AnalysisClient>>,
}
