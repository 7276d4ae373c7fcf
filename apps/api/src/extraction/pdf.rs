//! PDF text extraction over the `pdf-extract` crate.

use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

use crate::extraction::{ExtractionError, TextExtractor};

const PDF_MAGIC: &[u8] = b"%PDF-";
/// Readers accept the header anywhere in the first 1024 bytes.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Page-by-page extractor. Pages that produce no text are skipped; the rest are
/// concatenated in document order.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, document: &[u8]) -> Result<String, ExtractionError> {
        if !has_pdf_header(document) {
            return Err(ExtractionError::NotPdf);
        }

        // pdf-extract panics on some malformed inputs instead of returning an error.
        let pages = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(document)
        }))
        .map_err(|payload| ExtractionError::Panicked(panic_message(payload.as_ref())))?
        .map_err(|e| ExtractionError::Parse(e.to_string()))?;

        let page_count = pages.len();
        let text = join_pages(pages);

        if text.is_empty() {
            warn!("PDF with {page_count} page(s) yielded no extractable text");
        } else {
            debug!(
                "Extracted {} chars from {page_count} PDF page(s)",
                text.chars().count()
            );
        }

        Ok(text)
    }
}

fn has_pdf_header(document: &[u8]) -> bool {
    let window = &document[..document.len().min(HEADER_SEARCH_WINDOW)];
    window.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC)
}

/// Concatenates page texts, dropping blank pages. A newline is inserted between pages
/// only when the previous page did not already end in whitespace.
fn join_pages(pages: Vec<String>) -> String {
    let mut text = String::new();
    for page in pages {
        if page.trim().is_empty() {
            continue;
        }
        if !text.is_empty() && !text.ends_with(char::is_whitespace) {
            text.push('\n');
        }
        text.push_str(&page);
    }
    text
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
