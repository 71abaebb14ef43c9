//! Extracted-document types.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::listing::AuctionFields;

/// How a document's text was recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// The PDF text layer was readable
    Direct,
    /// Fell back to OCR on rendered page images
    Ocr,
}

/// A legal document converted to text, plus the structured fields parsed
/// from it. Referenced by an `AuctionRecord` (status + URL), never
/// embedded, so re-extraction can replace it without touching the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocument {
    /// Full recovered text
    pub text: String,

    /// Which extraction path produced the text
    pub method: ExtractionMethod,

    /// Ratio of recognizable words in the text, 0.0 to 1.0
    pub confidence: f64,

    /// SHA-256 of the source document bytes
    pub content_hash: String,

    /// Structured fields parsed from the text
    pub fields: AuctionFields,
}

impl ExtractedDocument {
    pub fn new(
        text: impl Into<String>,
        method: ExtractionMethod,
        confidence: f64,
        source_bytes: &[u8],
    ) -> Self {
        Self {
            text: text.into(),
            method,
            confidence,
            content_hash: hash_bytes(source_bytes),
            fields: AuctionFields::default(),
        }
    }

    /// Attach the parsed field set.
    pub fn with_fields(mut self, fields: AuctionFields) -> Self {
        self.fields = fields;
        self
    }

    /// Non-whitespace character count of the recovered text.
    pub fn content_chars(&self) -> usize {
        self.text.chars().filter(|c| !c.is_whitespace()).count()
    }
}

/// SHA-256 hex digest of a byte payload.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
