//! Analyze phase: market comparison and opportunity scoring.

use chrono::Utc;
use futures::StreamExt;
use tracing::{info, warn};

use crate::error::{AnalysisError, Result};
use crate::pipeline::Pipeline;
use crate::traits::market::MarketData;
use crate::traits::store::RecordStore;
use crate::types::market::ScoreResult;
use crate::types::record::AuctionRecord;

impl<S: RecordStore, M: MarketData> Pipeline<S, M> {
    /// Score a batch of records against the market. Results come back in
    /// input order; an auction that cannot be scored yields an
    /// unavailable result, never an error for the batch.
    pub async fn analyze(&self, records: &[AuctionRecord]) -> Result<Vec<ScoreResult>> {
        let results: Vec<ScoreResult> = futures::stream::iter(
            records.iter().map(|record| self.analyze_one(record)),
        )
        .buffered(self.config.concurrency)
        .collect()
        .await;

        let scored = results.iter().filter(|r| r.score.is_some()).count();
        info!(
            total = results.len(),
            scored,
            unavailable = results.len() - scored,
            "analysis complete"
        );
        Ok(results)
    }

    async fn analyze_one(&self, record: &AuctionRecord) -> ScoreResult {
        if self.cancel.is_cancelled() {
            return ScoreResult::unavailable(record.key.clone());
        }

        let estimate = match self.comparator.compare(record).await {
            Ok(estimate) => estimate,
            Err(AnalysisError::NoComparables { found, required }) => {
                // Score unavailable, not zero
                info!(
                    key = %record.key,
                    found,
                    required,
                    "no comparables, score unavailable"
                );
                return ScoreResult::unavailable(record.key.clone());
            }
            Err(e) => {
                warn!(key = %record.key, error = %e, "market data failed");
                return ScoreResult::unavailable(record.key.clone());
            }
        };

        let result = self.scorer.score(record, &estimate);

        if result.score.is_some() {
            let write_back = self
                .update_record(&record.key, |existing| {
                    let mut updated = existing.unwrap_or_else(|| {
                        // Record vanished between read and write; rebuild
                        // from the input with a fresh version
                        let mut rebuilt = record.clone();
                        rebuilt.version = 0;
                        rebuilt
                    });
                    updated.market_price_m2 = Some(estimate.price_per_m2);
                    updated.sale_price_m2 = updated.price_per_m2();
                    updated.discount_percent = result.discount_percent;
                    updated.opportunity_score = result.score;
                    updated.updated_at = Utc::now();
                    updated
                })
                .await;

            if let Err(e) = write_back {
                warn!(key = %record.key, error = %e, "failed to persist score");
            }
        }

        result
    }
}
