//! Pipeline configuration.
//!
//! One immutable value passed through every component's entry point; no
//! ambient global state. `validate` is the only fatal error path - every
//! other failure in the pipeline is isolated per record.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::listing::{FieldClass, Origin, SourceKind};

/// Origin groups used in the per-field-class priority tables. Listing
/// sources are one group; their relative order comes from
/// `PipelineConfig::sources`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginGroup {
    Document,
    Listings,
    Assist,
}

impl OriginGroup {
    fn contains(&self, origin: Origin) -> bool {
        matches!(
            (self, origin),
            (OriginGroup::Document, Origin::Document)
                | (OriginGroup::Listings, Origin::Listing(_))
                | (OriginGroup::Assist, Origin::Assist)
        )
    }
}

/// Thresholds and heuristics for document extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Minimum non-whitespace characters before the text layer counts as
    /// readable; below this, OCR is attempted
    pub min_text_chars: usize,

    /// Minimum ratio of recognizable words in the extracted text
    pub min_word_ratio: f64,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            min_text_chars: 200,
            min_word_ratio: 0.4,
        }
    }
}

/// Comparable selection and estimation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Look-back window for comparables, in months
    pub window_months: u32,

    /// Minimum comparables required for an estimate
    pub min_comparables: usize,

    /// Surface tolerance when the record's surface is known, in percent
    pub surface_tolerance_percent: f64,

    /// Price-per-m² sanity band; values outside are discarded as gifts,
    /// family transfers, or data errors
    pub price_m2_min: f64,
    pub price_m2_max: f64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            window_months: 24,
            min_comparables: 3,
            surface_tolerance_percent: 25.0,
            price_m2_min: 500.0,
            price_m2_max: 15_000.0,
        }
    }
}

/// Discount thresholds and the discount-to-score mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Discount percent at or above which the tier is `GoodDeal`
    pub good_deal_percent: f64,

    /// Discount percent at or above which the tier is `Opportunity`
    pub opportunity_percent: f64,

    /// Discount percent at or above which the tier is `Excellent`
    pub excellent_percent: f64,

    /// (discount %, score) breakpoints, strictly increasing in discount,
    /// non-decreasing in score; linear interpolation between points
    pub breakpoints: Vec<(f64, f64)>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            good_deal_percent: 20.0,
            opportunity_percent: 30.0,
            excellent_percent: 40.0,
            breakpoints: vec![
                (-100.0, 0.0),
                (0.0, 10.0),
                (10.0, 30.0),
                (20.0, 55.0),
                (30.0, 75.0),
                (40.0, 90.0),
                (100.0, 100.0),
            ],
        }
    }
}

/// Full pipeline configuration. Read-only for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Department codes in scope, e.g. ["75", "92", "93", "94"]
    pub regions: Vec<String>,

    /// Enabled sources, highest-priority first
    pub sources: Vec<SourceKind>,

    /// Minimum interval between requests to the same source, milliseconds
    pub request_min_interval_ms: u64,

    /// Retries (with exponential backoff) before a source is skipped
    pub max_retries: u32,

    /// HTTP timeout in seconds
    pub http_timeout_secs: u64,

    pub user_agent: String,

    /// Per-field-class origin priority, highest first
    pub priorities: IndexMap<FieldClass, Vec<OriginGroup>>,

    pub document: DocumentConfig,

    pub market: MarketConfig,

    pub scoring: ScoringConfig,

    /// Worker-pool size for per-auction tasks
    pub concurrency: usize,

    /// Read-merge-write attempts on a store conflict
    pub store_retry_limit: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let mut priorities = IndexMap::new();
        priorities.insert(
            FieldClass::Facts,
            vec![
                OriginGroup::Document,
                OriginGroup::Listings,
                OriginGroup::Assist,
            ],
        );
        priorities.insert(
            FieldClass::Urls,
            vec![
                OriginGroup::Listings,
                OriginGroup::Document,
                OriginGroup::Assist,
            ],
        );

        Self {
            regions: vec!["75".into(), "92".into(), "93".into(), "94".into()],
            sources: vec![
                SourceKind::Licitor,
                SourceKind::EncheresPubliques,
                SourceKind::Vench,
            ],
            request_min_interval_ms: 1500,
            max_retries: 3,
            http_timeout_secs: 30,
            user_agent: "encheres-bot/0.1".into(),
            priorities,
            document: DocumentConfig::default(),
            market: MarketConfig::default(),
            scoring: ScoringConfig::default(),
            concurrency: 4,
            store_retry_limit: 3,
        }
    }
}

impl PipelineConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the geographic scope.
    pub fn with_regions(mut self, regions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.regions = regions.into_iter().map(|r| r.into()).collect();
        self
    }

    /// Set the enabled sources, highest-priority first.
    pub fn with_sources(mut self, sources: impl IntoIterator<Item = SourceKind>) -> Self {
        self.sources = sources.into_iter().collect();
        self
    }

    /// Set the minimum request interval.
    pub fn with_request_interval_ms(mut self, ms: u64) -> Self {
        self.request_min_interval_ms = ms;
        self
    }

    /// Set the minimum comparable count.
    pub fn with_min_comparables(mut self, min: usize) -> Self {
        self.market.min_comparables = min;
        self
    }

    /// Set the worker-pool size.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// True when the postal code's department is in scope.
    pub fn in_scope(&self, postal_code: &str) -> bool {
        self.regions
            .iter()
            .any(|region| postal_code.starts_with(region.as_str()))
    }

    /// Merge priority of an origin for a field class. Higher wins.
    /// An origin absent from the class's table ranks zero.
    pub fn priority(&self, origin: Origin, class: FieldClass) -> u32 {
        let Some(groups) = self.priorities.get(&class) else {
            return 0;
        };
        let Some(group_pos) = groups.iter().position(|g| g.contains(origin)) else {
            return 0;
        };
        // Earlier group = higher base; listing sources refine by their
        // configured order within the Listings group
        let base = (groups.len() - group_pos) as u32 * 100;
        let refinement = match origin {
            Origin::Listing(kind) => self
                .sources
                .iter()
                .position(|s| *s == kind)
                .map(|pos| (self.sources.len() - pos) as u32)
                .unwrap_or(0),
            _ => 0,
        };
        base + refinement
    }

    /// Validate the configuration. Errors here are the only fatal
    /// startup failures.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.regions.is_empty() {
            return Err(ConfigError::Missing {
                name: "regions".into(),
            });
        }
        if self.sources.is_empty() {
            return Err(ConfigError::Missing {
                name: "sources".into(),
            });
        }
        if self.request_min_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                name: "request_min_interval_ms".into(),
                reason: "must be positive".into(),
            });
        }
        if self.market.min_comparables == 0 {
            return Err(ConfigError::Invalid {
                name: "market.min_comparables".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.market.price_m2_min >= self.market.price_m2_max {
            return Err(ConfigError::Invalid {
                name: "market.price_m2_min".into(),
                reason: "must be below price_m2_max".into(),
            });
        }
        let s = &self.scoring;
        if !(s.good_deal_percent < s.opportunity_percent
            && s.opportunity_percent < s.excellent_percent)
        {
            return Err(ConfigError::Invalid {
                name: "scoring thresholds".into(),
                reason: "must be strictly increasing".into(),
            });
        }
        if s.breakpoints.len() < 2 {
            return Err(ConfigError::Invalid {
                name: "scoring.breakpoints".into(),
                reason: "need at least two points".into(),
            });
        }
        for pair in s.breakpoints.windows(2) {
            if pair[1].0 <= pair[0].0 || pair[1].1 < pair[0].1 {
                return Err(ConfigError::Invalid {
                    name: "scoring.breakpoints".into(),
                    reason: "discounts must increase, scores must not decrease".into(),
                });
            }
        }
        if s.breakpoints.iter().any(|(_, y)| *y < 0.0 || *y > 100.0) {
            return Err(ConfigError::Invalid {
                name: "scoring.breakpoints".into(),
                reason: "scores must lie in [0, 100]".into(),
            });
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid {
                name: "concurrency".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.store_retry_limit == 0 {
            return Err(ConfigError::Invalid {
                name: "store_retry_limit".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn empty_regions_rejected() {
        let config = PipelineConfig::default().with_regions(Vec::<String>::new());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing { .. })
        ));
    }

    #[test]
    fn document_outranks_listings_for_facts() {
        let config = PipelineConfig::default();
        let doc = config.priority(Origin::Document, FieldClass::Facts);
        let listing = config.priority(Origin::Listing(SourceKind::Licitor), FieldClass::Facts);
        let assist = config.priority(Origin::Assist, FieldClass::Facts);
        assert!(doc > listing);
        assert!(listing > assist);
    }

    #[test]
    fn listings_outrank_document_for_urls() {
        let config = PipelineConfig::default();
        let doc = config.priority(Origin::Document, FieldClass::Urls);
        let listing = config.priority(Origin::Listing(SourceKind::Vench), FieldClass::Urls);
        assert!(listing > doc);
    }

    #[test]
    fn source_order_breaks_listing_ties() {
        let config = PipelineConfig::default();
        let licitor = config.priority(Origin::Listing(SourceKind::Licitor), FieldClass::Facts);
        let vench = config.priority(Origin::Listing(SourceKind::Vench), FieldClass::Facts);
        assert!(licitor > vench);
    }

    #[test]
    fn in_scope_matches_department_prefix() {
        let config = PipelineConfig::default();
        assert!(config.in_scope("75011"));
        assert!(config.in_scope("93200"));
        assert!(!config.in_scope("13001"));
    }
}
