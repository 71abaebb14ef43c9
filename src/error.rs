//! Typed errors for the auction pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Per-record failures are
//! isolated by the pipeline; only configuration errors are fatal.

use thiserror::Error;

/// Umbrella error for pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Source fetch failed
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Document fetch or extraction failed
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// Market analysis failed
    #[error("analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    /// Storage operation failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration invalid at startup
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Operation was cancelled
    #[error("operation cancelled")]
    Cancelled,
}

/// Errors from a listing source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Site unreachable after retries; skip the source for this run
    #[error("source unavailable: {detail}")]
    Unavailable { detail: String },

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Invalid URL format
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },
}

/// Errors from document fetching and extraction.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Document URL could not be fetched
    #[error("document unavailable: {url}")]
    Unavailable { url: String },

    /// Neither the text layer nor OCR recovered usable text
    #[error("extraction failed: {reason}")]
    ExtractionFailed { reason: String },

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors from market comparison.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Fewer comparables than the configured minimum
    #[error("no comparables found: {found} of {required} required")]
    NoComparables { found: usize, required: usize },

    /// Market-data collaborator failed
    #[error("market data error: {0}")]
    MarketData(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors from the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Concurrent write raced on the same identity key; retry read-merge-write
    #[error("write conflict on {key}")]
    Conflict { key: String },

    /// Backend failure
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Configuration errors. The only fatal class: raised by
/// `PipelineConfig::validate` before a run starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting is missing or empty
    #[error("missing required setting: {name}")]
    Missing { name: String },

    /// A setting value is out of range or inconsistent
    #[error("invalid setting {name}: {reason}")]
    Invalid { name: String, reason: String },
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Result type alias for source operations.
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Result type alias for document operations.
pub type DocumentResult<T> = std::result::Result<T, DocumentError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
