//! Text-recovery seams: the PDF text layer and pluggable OCR engines.
//!
//! Both traits are synchronous - the work is CPU-bound and the document
//! extractor runs it under `spawn_blocking`.

use crate::error::{DocumentError, DocumentResult};

/// Direct text extraction from document bytes.
pub trait TextLayer: Send + Sync {
    fn extract_text(&self, bytes: &[u8]) -> DocumentResult<String>;
}

/// OCR over rendered page images.
///
/// Engines are pluggable: the crate ships no OCR binding, the
/// application supplies one (tesseract, a vision API, ...). The document
/// extractor only requires that identical bytes yield identical text.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, bytes: &[u8]) -> DocumentResult<String>;
}

/// PDF text layer backed by `pdf-extract`.
pub struct PdfTextLayer;

impl TextLayer for PdfTextLayer {
    fn extract_text(&self, bytes: &[u8]) -> DocumentResult<String> {
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| DocumentError::ExtractionFailed {
            reason: e.to_string(),
        })
    }
}

/// An engine that recognizes nothing. Default when no OCR backend is
/// wired in; scanned documents then end as `ExtractionFailed`.
pub struct NoopOcr;

impl OcrEngine for NoopOcr {
    fn recognize(&self, _bytes: &[u8]) -> DocumentResult<String> {
        Ok(String::new())
    }
}
