//! Document extraction: direct text layer with OCR fallback.
//!
//! The extraction is deterministic - identical bytes always yield an
//! identical `ExtractedDocument` - so retries are safe. The CPU-bound
//! work runs under `spawn_blocking` to keep it off the network threads.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{DocumentError, DocumentResult};
use crate::traits::ocr::{NoopOcr, OcrEngine, PdfTextLayer, TextLayer};
use crate::types::config::DocumentConfig;
use crate::types::document::{ExtractedDocument, ExtractionMethod};

/// Converts document bytes into text, falling back to OCR when the text
/// layer is empty or degraded.
pub struct DocumentExtractor {
    text_layer: Arc<dyn TextLayer>,
    ocr: Arc<dyn OcrEngine>,
    config: DocumentConfig,
}

impl DocumentExtractor {
    /// Create an extractor with the PDF text layer and no OCR backend.
    pub fn new(config: DocumentConfig) -> Self {
        Self {
            text_layer: Arc::new(PdfTextLayer),
            ocr: Arc::new(NoopOcr),
            config,
        }
    }

    /// Replace the text layer.
    pub fn with_text_layer(mut self, text_layer: Arc<dyn TextLayer>) -> Self {
        self.text_layer = text_layer;
        self
    }

    /// Plug in an OCR engine.
    pub fn with_ocr(mut self, ocr: Arc<dyn OcrEngine>) -> Self {
        self.ocr = ocr;
        self
    }

    /// Extract text from a document payload.
    ///
    /// Never panics on degraded input: an unreadable document is an
    /// `ExtractionFailed` outcome, not an abort.
    pub async fn extract(&self, bytes: Vec<u8>) -> DocumentResult<ExtractedDocument> {
        let text_layer = Arc::clone(&self.text_layer);
        let ocr = Arc::clone(&self.ocr);
        let config = self.config.clone();

        tokio::task::spawn_blocking(move || extract_sync(&*text_layer, &*ocr, &config, &bytes))
            .await
            .map_err(|e| DocumentError::ExtractionFailed {
                reason: format!("extraction task failed: {e}"),
            })?
    }
}

fn extract_sync(
    text_layer: &dyn TextLayer,
    ocr: &dyn OcrEngine,
    config: &DocumentConfig,
    bytes: &[u8],
) -> DocumentResult<ExtractedDocument> {
    let direct = match text_layer.extract_text(bytes) {
        Ok(text) => text,
        Err(e) => {
            debug!(error = %e, "text layer failed, treating as empty");
            String::new()
        }
    };

    let direct_ratio = word_ratio(&direct);
    if is_usable(&direct, direct_ratio, config) {
        return Ok(
            ExtractedDocument::new(direct, ExtractionMethod::Direct, direct_ratio, bytes),
        );
    }

    info!(
        chars = non_whitespace_chars(&direct),
        ratio = direct_ratio,
        "text layer below content threshold, falling back to OCR"
    );

    let recognized = match ocr.recognize(bytes) {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "OCR failed");
            String::new()
        }
    };

    let ocr_ratio = word_ratio(&recognized);
    if is_usable(&recognized, ocr_ratio, config) {
        return Ok(ExtractedDocument::new(
            recognized,
            ExtractionMethod::Ocr,
            ocr_ratio,
            bytes,
        ));
    }

    Err(DocumentError::ExtractionFailed {
        reason: "no usable text from text layer or OCR".to_string(),
    })
}

fn is_usable(text: &str, ratio: f64, config: &DocumentConfig) -> bool {
    non_whitespace_chars(text) >= config.min_text_chars && ratio >= config.min_word_ratio
}

fn non_whitespace_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

/// Ratio of recognizable words among whitespace-separated tokens. A word
/// is recognizable when it is at least two characters and mostly
/// alphabetic - OCR noise fails this quickly.
fn word_ratio(text: &str) -> f64 {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return 0.0;
    }
    let recognizable = tokens
        .iter()
        .filter(|token| {
            let chars = token.chars().count();
            if chars < 2 {
                return false;
            }
            let alphabetic = token.chars().filter(|c| c.is_alphabetic()).count();
            alphabetic * 10 >= chars * 7
        })
        .count();
    recognizable as f64 / tokens.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedOcr, FixedTextLayer};
    use crate::types::config::DocumentConfig;

    fn extractor(direct: &str, ocr: &str) -> DocumentExtractor {
        DocumentExtractor::new(DocumentConfig::default())
            .with_text_layer(Arc::new(FixedTextLayer::new(direct)))
            .with_ocr(Arc::new(FixedOcr::new(ocr)))
    }

    fn readable_text() -> String {
        "Un appartement de trois pièces situé rue Oberkampf à Paris, \
         mise à prix cent mille euros, vente au tribunal judiciaire. "
            .repeat(3)
    }

    #[tokio::test]
    async fn readable_text_layer_wins() {
        let text = readable_text();
        let extractor = extractor(&text, "");
        let doc = extractor.extract(b"pdf".to_vec()).await.unwrap();
        assert_eq!(doc.method, ExtractionMethod::Direct);
        assert!(doc.confidence >= 0.4);
    }

    #[tokio::test]
    async fn short_text_falls_back_to_ocr() {
        let ocr_text = readable_text();
        let extractor = extractor("abc", &ocr_text);
        let doc = extractor.extract(b"scan".to_vec()).await.unwrap();
        assert_eq!(doc.method, ExtractionMethod::Ocr);
    }

    #[tokio::test]
    async fn garbage_text_layer_falls_back_to_ocr() {
        // Plenty of characters but nothing recognizable as words
        let noise = "3# 1/ &§ 9% €* 8= ".repeat(30);
        let ocr_text = readable_text();
        let extractor = extractor(&noise, &ocr_text);
        let doc = extractor.extract(b"scan".to_vec()).await.unwrap();
        assert_eq!(doc.method, ExtractionMethod::Ocr);
    }

    #[tokio::test]
    async fn unreadable_both_ways_is_extraction_failed() {
        let extractor = extractor("abc", "");
        let err = extractor.extract(b"scan".to_vec()).await.unwrap_err();
        assert!(matches!(err, DocumentError::ExtractionFailed { .. }));
    }

    #[tokio::test]
    async fn extraction_is_idempotent() {
        let text = readable_text();
        let extractor = extractor(&text, "");
        let a = extractor.extract(b"same bytes".to_vec()).await.unwrap();
        let b = extractor.extract(b"same bytes".to_vec()).await.unwrap();
        assert_eq!(a.text, b.text);
        assert_eq!(a.method, b.method);
        assert_eq!(a.content_hash, b.content_hash);
        assert_eq!(a.confidence, b.confidence);
    }
}
