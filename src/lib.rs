//! Judicial Real-Estate Auction Intelligence Pipeline
//!
//! Tracks judicial property auctions across French regions: listings are
//! ingested from heterogeneous web sources, reconciled into canonical
//! records, enriched from legal documents (PV) with an OCR fallback, and
//! scored against historical DVF transactions.
//!
//! # Design
//!
//! - Multi-source ingestion with per-source rate limiting; a fixed set
//!   of tagged adapter variants selected by configuration
//! - Order-independent record reconciliation keyed by a stable identity
//!   (normalized address, tribunal, sale date)
//! - Deterministic document extraction: text layer first, OCR fallback,
//!   pattern rules with an optional lower-trust assist path
//! - Median-based market comparison that refuses to estimate from too
//!   few comparables, and a pure monotone opportunity score
//!
//! # Usage
//!
//! ```rust,ignore
//! use encheres::{MemoryStore, Pipeline, PipelineConfig};
//! use encheres::analysis::DvfClient;
//! use std::sync::Arc;
//!
//! let config = PipelineConfig::default();
//! let store = Arc::new(MemoryStore::new());
//! let market = Arc::new(DvfClient::new());
//!
//! let pipeline = Pipeline::new(config, store, market)?;
//! let records = pipeline.ingest_all().await?;
//! let scores = pipeline.analyze(&records).await?;
//! ```
//!
//! # Modules
//!
//! - [`sources`] - one adapter per listing site
//! - [`extract`] - document and field extraction
//! - [`reconcile`] - identity keys and the field merge
//! - [`analysis`] - market comparator, scorer, DVF client
//! - [`pipeline`] - the orchestrator (`ingest_all` / `analyze`)
//! - [`traits`] - collaborator seams (store, market data, fetcher, OCR)
//! - [`stores`] - storage implementations
//! - [`testing`] - mocks and fixtures

pub mod analysis;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod reconcile;
pub mod sources;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{
    AnalysisError, ConfigError, DocumentError, PipelineError, Result, SourceError, StoreError,
};
pub use types::{
    config::{DocumentConfig, MarketConfig, OriginGroup, PipelineConfig, ScoringConfig},
    document::{ExtractedDocument, ExtractionMethod},
    listing::{AuctionFields, Confidence, Field, FieldClass, Origin, Provenance, RawListing, SourceKind},
    market::{ComparableTransaction, MarketEstimate, ScoreResult, Tier},
    record::{AuctionRecord, DocumentStatus, IdentityKey, PropertyType},
};

// Re-export the orchestrator and main components
pub use analysis::{DvfClient, MarketComparator, OpportunityScorer};
pub use extract::{DocumentExtractor, ExtractedFieldSet, FieldExtractor};
pub use pipeline::Pipeline;
pub use reconcile::{identity_key, identity_key_for, merge, normalize_text};
pub use sources::{Source, SourceQuery};
pub use stores::MemoryStore;

// Re-export trait seams
pub use traits::{
    assist::AssistExtractor,
    fetcher::{DocumentDirectory, DocumentFetcher, HttpDocumentFetcher, NoDirectory},
    market::MarketData,
    ocr::{NoopOcr, OcrEngine, PdfTextLayer, TextLayer},
    store::{RecordFilter, RecordStore},
};
