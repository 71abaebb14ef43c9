//! Market comparator - comparable selection and the median estimate.

use chrono::{Months, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::AnalysisError;
use crate::traits::market::MarketData;
use crate::types::config::MarketConfig;
use crate::types::market::{ComparableTransaction, MarketEstimate};
use crate::types::record::AuctionRecord;

/// Computes a market price per m² for an auction from comparable
/// historical transactions.
pub struct MarketComparator<M: MarketData> {
    market: Arc<M>,
    config: MarketConfig,
}

impl<M: MarketData> MarketComparator<M> {
    pub fn new(market: Arc<M>, config: MarketConfig) -> Self {
        Self { market, config }
    }

    /// Retrieve and filter comparables, then take the median price per
    /// m². Signals `NoComparables` below the configured minimum count
    /// rather than returning a low-confidence estimate.
    pub async fn compare(&self, record: &AuctionRecord) -> Result<MarketEstimate, AnalysisError> {
        let required = self.config.min_comparables;

        let Some(district) = record.district() else {
            return Err(AnalysisError::NoComparables { found: 0, required });
        };

        let transactions = self
            .market
            .comparables(district, self.config.window_months, record.property_type)
            .await?;

        let prices = self.filter_prices(record, district, &transactions);
        debug!(
            district,
            retrieved = transactions.len(),
            usable = prices.len(),
            "comparable filtering"
        );

        if prices.len() < required {
            warn!(
                district,
                found = prices.len(),
                required,
                "not enough comparables for an estimate"
            );
            return Err(AnalysisError::NoComparables {
                found: prices.len(),
                required,
            });
        }

        Ok(MarketEstimate {
            price_per_m2: median(prices),
            comparable_count: transactions.len(),
            district: district.to_string(),
            window_months: self.config.window_months,
        })
    }

    /// Price-per-m² values of the comparables that survive filtering:
    /// same district, inside the time window, compatible property type,
    /// surface within tolerance of the record's, and price per m² inside
    /// the sanity band.
    fn filter_prices(
        &self,
        record: &AuctionRecord,
        district: &str,
        transactions: &[ComparableTransaction],
    ) -> Vec<f64> {
        let cutoff = Utc::now()
            .date_naive()
            .checked_sub_months(Months::new(self.config.window_months))
            .unwrap_or(chrono::NaiveDate::MIN);

        let surface_bounds = record.surface.map(|surface| {
            let tolerance = surface * self.config.surface_tolerance_percent / 100.0;
            (surface - tolerance, surface + tolerance)
        });

        transactions
            .iter()
            .filter(|tx| tx.district == district)
            .filter(|tx| tx.sale_date >= cutoff)
            .filter(|tx| match (record.property_type, tx.property_type) {
                (Some(wanted), Some(actual)) => wanted.comparable_with(actual),
                _ => true,
            })
            .filter(|tx| match (surface_bounds, tx.surface) {
                (Some((min, max)), Some(surface)) => surface >= min && surface <= max,
                _ => true,
            })
            .filter_map(|tx| tx.price_per_m2())
            .filter(|ppm2| *ppm2 >= self.config.price_m2_min && *ppm2 <= self.config.price_m2_max)
            .collect()
    }
}

/// Median of a non-empty value set; even counts average the middle pair.
fn median(mut values: Vec<f64>) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = values.len();
    if n % 2 == 0 {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    } else {
        values[n / 2]
    }
}
