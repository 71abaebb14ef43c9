//! Enchères Publiques adapter - city-indexed auction listings.

use regex::Regex;
use tracing::{info, warn};

use crate::error::SourceResult;
use crate::extract::FieldExtractor;
use crate::sources::client::{resolve_href, strip_tags, SourceClient};
use crate::sources::SourceQuery;
use crate::types::config::PipelineConfig;
use crate::types::listing::{RawListing, SourceKind};

const BASE_URL: &str = "https://www.encheres-publiques.com";

/// Adapter for encheres-publiques.com listing pages.
///
/// The site marks each lot with a `data-lot` id and carries the visit
/// schedule inline, which licitor does not.
pub struct EncheresPubliquesAdapter {
    client: SourceClient,
    base_url: String,
    regions: Vec<String>,
    item_pattern: Regex,
    lot_id_pattern: Regex,
    link_pattern: Regex,
    pdf_pattern: Regex,
    fields: FieldExtractor,
}

impl EncheresPubliquesAdapter {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            client: SourceClient::new(config),
            base_url: BASE_URL.to_string(),
            regions: config.regions.clone(),
            item_pattern: Regex::new(r#"(?s)<div[^>]*class="[^"]*lot[^"]*"[^>]*>(.*?)</div>\s*<!--\s*/lot\s*-->"#)
                .unwrap(),
            lot_id_pattern: Regex::new(r#"data-lot="(\d+)""#).unwrap(),
            link_pattern: Regex::new(r#"href="(/ventes/immobilier/[^"]+)""#).unwrap(),
            pdf_pattern: Regex::new(r#"href="([^"]+\.pdf)""#).unwrap(),
            fields: FieldExtractor::new(),
        }
    }

    /// Point the adapter at a different host (tests, mirrors).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn listing_url(&self, page: usize) -> String {
        format!("{}/ventes/immobilier?page={}", self.base_url, page)
    }

    pub async fn fetch(&self, query: &SourceQuery) -> SourceResult<Vec<RawListing>> {
        let mut listings = Vec::new();

        for page in 1..=query.max_pages {
            let html = self
                .client
                .get_text(SourceKind::EncheresPubliques, &self.listing_url(page))
                .await?;

            let page_listings = self.parse_page(&html);
            if page_listings.is_empty() {
                break;
            }
            listings.extend(page_listings);
        }

        info!(
            source = "encheres_publiques",
            count = listings.len(),
            "fetch complete"
        );
        Ok(listings)
    }

    /// Parse one listing page; malformed lots are skipped with a warning.
    pub fn parse_page(&self, html: &str) -> Vec<RawListing> {
        let mut listings = Vec::new();

        for (index, caps) in self.item_pattern.captures_iter(html).enumerate() {
            let snippet = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
            match self.parse_item(snippet) {
                Some(listing) => {
                    if let Some(postal) = &listing.fields.postal_code {
                        if !self.in_scope(postal) {
                            continue;
                        }
                    }
                    listings.push(listing);
                }
                None => {
                    warn!(
                        source = "encheres_publiques",
                        index, "skipping unparseable lot"
                    );
                }
            }
        }

        listings
    }

    fn parse_item(&self, snippet: &str) -> Option<RawListing> {
        let source_id = self.lot_id_pattern.captures(snippet)?[1].to_string();
        let url = self
            .link_pattern
            .captures(snippet)
            .and_then(|caps| resolve_href(&self.base_url, &caps[1]))
            .unwrap_or_default();

        let text = strip_tags(snippet);
        let mut fields = self.fields.extract(&text).fields;

        if let Some(pdf) = self.pdf_pattern.captures(snippet) {
            fields.document_url = resolve_href(&self.base_url, &pdf[1]);
        }

        Some(RawListing::new(
            SourceKind::EncheresPubliques,
            source_id,
            url,
            snippet.to_string(),
            fields,
        ))
    }

    fn in_scope(&self, postal_code: &str) -> bool {
        self.regions
            .iter()
            .any(|region| postal_code.starts_with(region.as_str()))
    }
}
