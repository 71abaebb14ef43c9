//! Mock implementations for testing and offline runs.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::{DocumentError, DocumentResult, SourceResult};
use crate::traits::assist::AssistExtractor;
use crate::traits::fetcher::{DocumentDirectory, DocumentFetcher};
use crate::traits::market::MarketData;
use crate::traits::ocr::{OcrEngine, TextLayer};
use crate::types::listing::{AuctionFields, RawListing, SourceKind};
use crate::types::market::ComparableTransaction;
use crate::types::record::{AuctionRecord, PropertyType};

/// A source that serves canned listings. Doubles as the offline variant
/// of `Source` and as the test double for adapters.
pub struct FixtureSource {
    kind: SourceKind,
    listings: Vec<RawListing>,
}

impl FixtureSource {
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            listings: Vec::new(),
        }
    }

    pub fn with_listing(mut self, listing: RawListing) -> Self {
        self.listings.push(listing);
        self
    }

    pub fn with_listings(mut self, listings: impl IntoIterator<Item = RawListing>) -> Self {
        self.listings.extend(listings);
        self
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub async fn fetch(&self, _query: &crate::sources::SourceQuery) -> SourceResult<Vec<RawListing>> {
        Ok(self.listings.clone())
    }
}

/// Market data backed by a fixed transaction list.
pub struct MockMarketData {
    transactions: Vec<ComparableTransaction>,
}

impl MockMarketData {
    pub fn new(transactions: Vec<ComparableTransaction>) -> Self {
        Self { transactions }
    }

    /// An empty market - every comparison signals `NoComparables`.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl MarketData for MockMarketData {
    async fn comparables(
        &self,
        _district: &str,
        _window_months: u32,
        _property_type: Option<PropertyType>,
    ) -> Result<Vec<ComparableTransaction>, crate::error::AnalysisError> {
        Ok(self.transactions.clone())
    }
}

/// Document fetcher serving bytes from a URL map.
#[derive(Default)]
pub struct MockDocumentFetcher {
    documents: HashMap<String, Vec<u8>>,
}

impl MockDocumentFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.documents.insert(url.into(), bytes.into());
        self
    }
}

#[async_trait]
impl DocumentFetcher for MockDocumentFetcher {
    async fn fetch_document(&self, url: &str) -> DocumentResult<Vec<u8>> {
        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| DocumentError::Unavailable {
                url: url.to_string(),
            })
    }
}

/// A directory that returns a fixed URL list for every record.
pub struct MockDirectory {
    urls: Vec<String>,
}

impl MockDirectory {
    pub fn new(urls: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            urls: urls.into_iter().map(|u| u.into()).collect(),
        }
    }
}

#[async_trait]
impl DocumentDirectory for MockDirectory {
    async fn documents_for(&self, _record: &AuctionRecord) -> DocumentResult<Vec<String>> {
        Ok(self.urls.clone())
    }
}

/// Text layer that returns a fixed string for any bytes.
pub struct FixedTextLayer {
    text: String,
}

impl FixedTextLayer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl TextLayer for FixedTextLayer {
    fn extract_text(&self, _bytes: &[u8]) -> DocumentResult<String> {
        Ok(self.text.clone())
    }
}

/// OCR engine that returns a fixed string for any bytes.
pub struct FixedOcr {
    text: String,
}

impl FixedOcr {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl OcrEngine for FixedOcr {
    fn recognize(&self, _bytes: &[u8]) -> DocumentResult<String> {
        Ok(self.text.clone())
    }
}

/// Assist extractor that returns a fixed field set.
pub struct MockAssist {
    fields: AuctionFields,
}

impl MockAssist {
    pub fn new(fields: AuctionFields) -> Self {
        Self { fields }
    }
}

#[async_trait]
impl AssistExtractor for MockAssist {
    async fn extract_fields(&self, _text: &str) -> DocumentResult<AuctionFields> {
        Ok(self.fields.clone())
    }
}
