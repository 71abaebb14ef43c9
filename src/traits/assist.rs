//! Language-model-assisted extraction seam.
//!
//! An optional enrichment path behind the same field-set contract as the
//! pattern rules. Its output is tagged with `Confidence::Assist` and
//! never overrules a pattern match.

use async_trait::async_trait;

use crate::error::DocumentResult;
use crate::types::listing::AuctionFields;

/// Extracts auction fields from document text using a language model.
#[async_trait]
pub trait AssistExtractor: Send + Sync {
    /// Best-effort field extraction; absent fields stay `None`.
    async fn extract_fields(&self, text: &str) -> DocumentResult<AuctionFields>;
}
