// Résumé text extraction.
// Extraction is CPU-bound: call it through tokio::task::spawn_blocking from async code.

pub mod pdf;

use thiserror::Error;

pub use pdf::PdfTextExtractor;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("file is not a PDF document")]
    NotPdf,

    #[error("{0}")]
    Parse(String),

    #[error("PDF parser aborted: {0}")]
    Panicked(String),
}

/// Turns an uploaded document into plain text.
///
/// Held in `AppState` as `Arc<dyn TextExtractor>` so handlers can be tested with a stub.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, document: &[u8]) -> Result<String, ExtractionError>;
}
