//! Market-comparison types - comparables, estimates, and score results.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::record::{IdentityKey, PropertyType};

/// One historical sale from the DVF dataset. Read-only reference data;
/// never mutated by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparableTransaction {
    pub address: String,

    /// Postal (district) code
    pub district: String,

    /// Sale price in euros
    pub sale_price: f64,

    /// Surface in m²
    pub surface: Option<f64>,

    pub sale_date: NaiveDate,

    pub property_type: Option<PropertyType>,
}

impl ComparableTransaction {
    /// Price per m², when the surface is known and positive.
    pub fn price_per_m2(&self) -> Option<f64> {
        match self.surface {
            Some(surface) if surface > 0.0 && self.sale_price > 0.0 => {
                Some(self.sale_price / surface)
            }
            _ => None,
        }
    }
}

/// Market price estimate for one auction's district.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketEstimate {
    /// Median price per m² over the filtered comparable set
    pub price_per_m2: f64,

    /// How many comparables survived filtering
    pub comparable_count: usize,

    /// District the comparables were drawn from
    pub district: String,

    /// Look-back window used, in months
    pub window_months: u32,
}

impl MarketEstimate {
    /// Estimated market value for a given surface.
    pub fn value_for_surface(&self, surface: f64) -> f64 {
        self.price_per_m2 * surface
    }
}

/// Classification tier, assigned from the discount thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// No score available, or discount below the first threshold
    #[default]
    None,
    /// Discount at or above the good-deal threshold
    GoodDeal,
    /// Discount at or above the opportunity threshold
    Opportunity,
    /// Discount at or above the excellent threshold
    Excellent,
}

/// Scoring outcome for one auction. Fully recomputable from the record
/// and its comparables; never persisted as source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResult {
    pub key: IdentityKey,

    /// Relative gap between market and asking price per m², clamped
    pub discount_percent: Option<f64>,

    /// 0-100 opportunity score; `None` when no estimate was available
    pub score: Option<f64>,

    pub tier: Tier,
}

impl ScoreResult {
    /// A result for an auction that could not be scored.
    pub fn unavailable(key: IdentityKey) -> Self {
        Self {
            key,
            discount_percent: None,
            score: None,
            tier: Tier::None,
        }
    }
}
