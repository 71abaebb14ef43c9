//! Pipeline orchestrator.
//!
//! Sequences adapters, reconciliation, document extraction, and scoring
//! per auction. One operation per external phase: `ingest_all` and
//! `analyze`. Per-record failures are isolated and logged; the batch
//! never aborts for one record.

mod analyze;
mod ingest;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::analysis::{MarketComparator, OpportunityScorer};
use crate::error::{PipelineError, Result, StoreError};
use crate::extract::{DocumentExtractor, FieldExtractor};
use crate::sources::Source;
use crate::traits::assist::AssistExtractor;
use crate::traits::fetcher::{DocumentDirectory, DocumentFetcher, HttpDocumentFetcher, NoDirectory};
use crate::traits::market::MarketData;
use crate::traits::store::RecordStore;
use crate::types::config::PipelineConfig;
use crate::types::record::{AuctionRecord, IdentityKey};

/// The auction intelligence pipeline.
///
/// Holds the immutable run configuration and the collaborator handles;
/// all shared mutable state lives behind the store's serializing
/// interface.
pub struct Pipeline<S: RecordStore, M: MarketData> {
    config: PipelineConfig,
    store: Arc<S>,
    comparator: MarketComparator<M>,
    scorer: OpportunityScorer,
    sources: Vec<Source>,
    extractor: DocumentExtractor,
    fields: FieldExtractor,
    fetcher: Arc<dyn DocumentFetcher>,
    directory: Arc<dyn DocumentDirectory>,
    assist: Option<Arc<dyn AssistExtractor>>,
    cancel: CancellationToken,
}

impl<S: RecordStore, M: MarketData> Pipeline<S, M> {
    /// Build a pipeline. Validates the configuration - the only fatal
    /// error path; everything later is per-record.
    pub fn new(config: PipelineConfig, store: Arc<S>, market: Arc<M>) -> Result<Self> {
        config.validate().map_err(PipelineError::Config)?;

        let sources = config
            .sources
            .iter()
            .map(|kind| Source::for_kind(*kind, &config))
            .collect();

        Ok(Self {
            comparator: MarketComparator::new(market, config.market.clone()),
            scorer: OpportunityScorer::new(config.scoring.clone()),
            sources,
            extractor: DocumentExtractor::new(config.document.clone()),
            fields: FieldExtractor::new(),
            fetcher: Arc::new(HttpDocumentFetcher::new()),
            directory: Arc::new(NoDirectory),
            assist: None,
            cancel: CancellationToken::new(),
            store,
            config,
        })
    }

    /// Replace the adapter set (fixtures, subsets).
    pub fn with_sources(mut self, sources: Vec<Source>) -> Self {
        self.sources = sources;
        self
    }

    /// Replace the document fetcher.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn DocumentFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Set the lawyer/document directory collaborator.
    pub fn with_directory(mut self, directory: Arc<dyn DocumentDirectory>) -> Self {
        self.directory = directory;
        self
    }

    /// Enable the language-model-assisted extraction path.
    pub fn with_assist(mut self, assist: Arc<dyn AssistExtractor>) -> Self {
        self.assist = Some(assist);
        self
    }

    /// Replace the document extractor (custom text layer or OCR engine).
    pub fn with_document_extractor(mut self, extractor: DocumentExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Token for the global stop signal. Cancelling it lets in-flight
    /// per-auction tasks finish cleanly and stops scheduling new ones.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The run configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Read-merge-write with bounded conflict retries. `apply` must be
    /// pure so a retry on a fresh read stays correct.
    pub(crate) async fn update_record<F>(&self, key: &IdentityKey, apply: F) -> Result<AuctionRecord>
    where
        F: Fn(Option<AuctionRecord>) -> AuctionRecord,
    {
        for attempt in 0..self.config.store_retry_limit {
            let current = self.store.get(key).await.map_err(PipelineError::Store)?;
            let updated = apply(current);
            match self.store.upsert(updated).await {
                Ok(stored) => return Ok(stored),
                Err(StoreError::Conflict { .. }) => {
                    warn!(
                        key = %key,
                        attempt = attempt + 1,
                        limit = self.config.store_retry_limit,
                        "write conflict, re-reading"
                    );
                }
                Err(e) => return Err(PipelineError::Store(e)),
            }
        }

        Err(PipelineError::Store(StoreError::Conflict {
            key: key.to_string(),
        }))
    }
}
