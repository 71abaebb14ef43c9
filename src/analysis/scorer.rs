//! Opportunity scorer - discount, score, and tier.
//!
//! Deterministic and pure: same record and estimate always yield the
//! same result. The score is a monotone piecewise-linear map of the
//! discount percentage; tiers come from the configured thresholds.

use crate::types::config::ScoringConfig;
use crate::types::market::{MarketEstimate, ScoreResult, Tier};
use crate::types::record::AuctionRecord;

/// Bounds for the clamped discount percentage.
const DISCOUNT_MIN: f64 = -100.0;
const DISCOUNT_MAX: f64 = 100.0;

pub struct OpportunityScorer {
    config: ScoringConfig,
}

impl OpportunityScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Score an auction against a market estimate.
    ///
    /// A record without a computable price per m² yields an unavailable
    /// result (score `None`, tier `None`), never a zero.
    pub fn score(&self, record: &AuctionRecord, estimate: &MarketEstimate) -> ScoreResult {
        let Some(sale_ppm2) = record.price_per_m2() else {
            return ScoreResult::unavailable(record.key.clone());
        };
        if estimate.price_per_m2 <= 0.0 {
            return ScoreResult::unavailable(record.key.clone());
        }

        let discount = self.discount_percent(sale_ppm2, estimate.price_per_m2);

        ScoreResult {
            key: record.key.clone(),
            discount_percent: Some(discount),
            score: Some(self.score_for(discount)),
            tier: self.tier_for(discount),
        }
    }

    /// Clamped discount percentage: how far the asking price per m² sits
    /// below the market price per m².
    pub fn discount_percent(&self, sale_ppm2: f64, market_ppm2: f64) -> f64 {
        let discount = (market_ppm2 - sale_ppm2) / market_ppm2 * 100.0;
        discount.clamp(DISCOUNT_MIN, DISCOUNT_MAX)
    }

    /// Map a discount onto [0, 100] by linear interpolation over the
    /// configured breakpoints.
    pub fn score_for(&self, discount: f64) -> f64 {
        let points = &self.config.breakpoints;
        let (first, last) = (points[0], points[points.len() - 1]);

        if discount <= first.0 {
            return first.1;
        }
        if discount >= last.0 {
            return last.1;
        }

        for pair in points.windows(2) {
            let (x0, y0) = pair[0];
            let (x1, y1) = pair[1];
            if discount <= x1 {
                let t = (discount - x0) / (x1 - x0);
                return y0 + t * (y1 - y0);
            }
        }

        last.1
    }

    /// Classification tier; thresholds are inclusive.
    pub fn tier_for(&self, discount: f64) -> Tier {
        if discount >= self.config.excellent_percent {
            Tier::Excellent
        } else if discount >= self.config.opportunity_percent {
            Tier::Opportunity
        } else if discount >= self.config.good_deal_percent {
            Tier::GoodDeal
        } else {
            Tier::None
        }
    }
}
