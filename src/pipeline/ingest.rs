//! Ingest phase: fetch every enabled source, reconcile listings into
//! canonical records, then extract pending documents.

use chrono::Utc;
use futures::StreamExt;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::error::{DocumentError, Result};
use crate::pipeline::Pipeline;
use crate::reconcile;
use crate::sources::SourceQuery;
use crate::traits::market::MarketData;
use crate::traits::store::RecordStore;
use crate::types::listing::{Origin, Provenance, RawListing};
use crate::types::record::{AuctionRecord, DocumentStatus, IdentityKey};

impl<S: RecordStore, M: MarketData> Pipeline<S, M> {
    /// Run the ingest phase and return the records it touched.
    ///
    /// A failed source is skipped for this run; a failed listing or
    /// document is skipped for this record. Neither aborts the batch.
    pub async fn ingest_all(&self) -> Result<Vec<AuctionRecord>> {
        let query = SourceQuery::default();
        let mut touched: BTreeSet<IdentityKey> = BTreeSet::new();

        for source in &self.sources {
            if self.cancel.is_cancelled() {
                info!("stop signal received, ending ingest");
                break;
            }

            let listings = match source.fetch(&query).await {
                Ok(listings) => listings,
                Err(e) => {
                    warn!(
                        source = %source.kind(),
                        error = %e,
                        "source unavailable, skipping for this run"
                    );
                    continue;
                }
            };

            info!(source = %source.kind(), count = listings.len(), "listings fetched");

            for listing in listings {
                // Without any identity component every such listing would
                // collapse onto the empty-triple key
                if listing.fields.address.is_none() && listing.fields.sale_date.is_none() {
                    warn!(
                        source = %listing.source,
                        url = %listing.url,
                        "listing has no identity fields, skipping"
                    );
                    continue;
                }
                match self.reconcile_listing(&listing).await {
                    Ok(key) => {
                        touched.insert(key);
                    }
                    Err(e) => {
                        warn!(
                            source = %listing.source,
                            url = %listing.url,
                            error = %e,
                            "failed to reconcile listing"
                        );
                    }
                }
            }
        }

        self.process_documents(&touched).await;

        let mut records = Vec::with_capacity(touched.len());
        for key in &touched {
            if let Some(record) = self.store.get(key).await? {
                records.push(record);
            }
        }

        info!(records = records.len(), "ingest complete");
        Ok(records)
    }

    /// Merge one raw listing into its canonical record and return the
    /// identity key it resolved to.
    async fn reconcile_listing(&self, listing: &RawListing) -> Result<IdentityKey> {
        let key = reconcile::identity_key_for(&listing.fields);
        let merge_key = key.clone();
        let provenance = listing.provenance();
        let fields = listing.fields.clone();
        let listing_url = listing.url.clone();
        let config = &self.config;

        self.update_record(&key, move |existing| {
            let mut record = reconcile::merge(existing, &merge_key, &fields, provenance, config);
            if !listing_url.is_empty() {
                reconcile::note_listing_url(&mut record, &listing_url);
            }
            record
        })
        .await?;

        Ok(key)
    }

    /// Document stage: fetch and extract the PV for every record that
    /// has one pending, over the bounded worker pool. The PDF/OCR work
    /// itself runs off the async threads inside the extractor.
    async fn process_documents(&self, keys: &BTreeSet<IdentityKey>) {
        futures::stream::iter(keys)
            .for_each_concurrent(self.config.concurrency, |key| async move {
                if self.cancel.is_cancelled() {
                    return;
                }
                if let Err(e) = self.process_document(key).await {
                    warn!(key = %key, error = %e, "document processing failed");
                }
            })
            .await;
    }

    async fn process_document(&self, key: &IdentityKey) -> Result<()> {
        let Some(record) = self.store.get(key).await? else {
            return Ok(());
        };

        let record = self.locate_document(record).await?;

        if record.document_status != DocumentStatus::Pending {
            return Ok(());
        }
        let Some(url) = record.document_url.clone() else {
            return Ok(());
        };

        let bytes = match self.fetcher.fetch_document(&url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                // Unreachable documents stay pending for the next run
                warn!(key = %key, url = %url, error = %e, "document unavailable");
                return Ok(());
            }
        };

        let retrieved_at = Utc::now();
        match self.extractor.extract(bytes).await {
            Ok(document) => {
                let mut set = self.fields.extract(&document.text);
                if let Some(assist) = &self.assist {
                    match assist.extract_fields(&document.text).await {
                        Ok(assist_fields) => {
                            set = self.fields.merge_assist(set, assist_fields);
                        }
                        Err(e) => debug!(key = %key, error = %e, "assist extraction failed"),
                    }
                }

                let pattern_patch = set.pattern_fields();
                let assist_patch = set.assist_fields();
                let config = &self.config;

                self.update_record(key, move |existing| {
                    let mut record = reconcile::merge(
                        existing,
                        key,
                        &pattern_patch,
                        Provenance::new(Origin::Document, retrieved_at),
                        config,
                    );
                    if !assist_patch.is_empty() {
                        record = reconcile::merge(
                            Some(record),
                            key,
                            &assist_patch,
                            Provenance::new(Origin::Assist, retrieved_at),
                            config,
                        );
                    }
                    record.document_status = DocumentStatus::Extracted;
                    record
                })
                .await?;

                info!(key = %key, method = ?document.method, "document extracted");
            }
            Err(DocumentError::ExtractionFailed { reason }) => {
                warn!(key = %key, reason = %reason, "document extraction failed");
                self.update_record(key, |existing| {
                    let mut record =
                        existing.unwrap_or_else(|| AuctionRecord::new(key.clone()));
                    record.document_status = DocumentStatus::ExtractionFailed;
                    record.updated_at = Utc::now();
                    record
                })
                .await?;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "document extraction errored");
            }
        }

        Ok(())
    }

    /// Ask the directory collaborator for a PV URL when the sources did
    /// not link one. Returns the freshest record state.
    async fn locate_document(&self, record: AuctionRecord) -> Result<AuctionRecord> {
        if record.document_url.is_some() || record.document_status != DocumentStatus::NotFound {
            return Ok(record);
        }

        let urls = match self.directory.documents_for(&record).await {
            Ok(urls) => urls,
            Err(e) => {
                debug!(key = %record.key, error = %e, "document directory lookup failed");
                return Ok(record);
            }
        };
        let Some(url) = urls.into_iter().next() else {
            return Ok(record);
        };

        let key = record.key.clone();
        let merge_key = key.clone();
        let config = &self.config;
        let patch = crate::types::listing::AuctionFields::new().with_document_url(url);
        let provenance = Provenance::new(Origin::Document, Utc::now());

        self.update_record(&key, move |existing| {
            reconcile::merge(existing, &merge_key, &patch, provenance, config)
        })
        .await
    }
}
