//! Vench adapter - per-tribunal sale calendars.

use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::SourceResult;
use crate::extract::FieldExtractor;
use crate::sources::client::{resolve_href, strip_tags, SourceClient};
use crate::sources::SourceQuery;
use crate::types::config::PipelineConfig;
use crate::types::listing::{RawListing, SourceKind};

const BASE_URL: &str = "https://www.vench.fr";

/// Tribunal calendar slugs per department in scope.
const TRIBUNAL_SLUGS: [(&str, &str, &str); 4] = [
    ("75", "paris", "Tribunal Judiciaire de Paris"),
    ("92", "nanterre", "Tribunal Judiciaire de Nanterre"),
    ("93", "bobigny", "Tribunal Judiciaire de Bobigny"),
    ("94", "creteil", "Tribunal Judiciaire de Créteil"),
];

/// Adapter for vench.fr. Unlike the other sources, vench publishes one
/// calendar page per tribunal, so the fetch iterates tribunals in scope
/// rather than result pages.
pub struct VenchAdapter {
    client: SourceClient,
    base_url: String,
    regions: Vec<String>,
    row_pattern: Regex,
    ref_pattern: Regex,
    link_pattern: Regex,
    fields: FieldExtractor,
}

impl VenchAdapter {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            client: SourceClient::new(config),
            base_url: BASE_URL.to_string(),
            regions: config.regions.clone(),
            row_pattern: Regex::new(r#"(?s)<tr[^>]*class="[^"]*vente[^"]*"[^>]*>(.*?)</tr>"#)
                .unwrap(),
            ref_pattern: Regex::new(r#"data-ref="([A-Z0-9\-]+)""#).unwrap(),
            link_pattern: Regex::new(r#"href="(/vente/[^"]+)""#).unwrap(),
            fields: FieldExtractor::new(),
        }
    }

    /// Point the adapter at a different host (tests, mirrors).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn calendar_url(&self, slug: &str) -> String {
        format!(
            "{}/liste-des-ventes-au-tribunal-judiciaire-{}.html",
            self.base_url, slug
        )
    }

    /// Fetch the calendar of every tribunal in scope. `query` is accepted
    /// for signature parity; vench has no result paging.
    pub async fn fetch(&self, _query: &SourceQuery) -> SourceResult<Vec<RawListing>> {
        let mut listings = Vec::new();

        for region in &self.regions {
            let Some((_, slug, tribunal)) = TRIBUNAL_SLUGS
                .iter()
                .find(|(department, _, _)| *department == region.as_str())
            else {
                debug!(source = "vench", region = %region, "no tribunal calendar for region");
                continue;
            };

            let html = self
                .client
                .get_text(SourceKind::Vench, &self.calendar_url(slug))
                .await?;
            listings.extend(self.parse_page(&html, tribunal));
        }

        info!(source = "vench", count = listings.len(), "fetch complete");
        Ok(listings)
    }

    /// Parse one tribunal calendar. The tribunal is not repeated per row,
    /// so it is stamped onto every listing here.
    pub fn parse_page(&self, html: &str, tribunal: &str) -> Vec<RawListing> {
        let mut listings = Vec::new();

        for (index, caps) in self.row_pattern.captures_iter(html).enumerate() {
            let row = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
            match self.parse_row(row, tribunal) {
                Some(listing) => listings.push(listing),
                None => {
                    warn!(source = "vench", index, "skipping unparseable row");
                }
            }
        }

        listings
    }

    fn parse_row(&self, row: &str, tribunal: &str) -> Option<RawListing> {
        let source_id = self.ref_pattern.captures(row)?[1].to_string();
        let url = self
            .link_pattern
            .captures(row)
            .and_then(|caps| resolve_href(&self.base_url, &caps[1]))
            .unwrap_or_default();

        let text = strip_tags(row);
        let mut fields = self.fields.extract(&text).fields;
        if fields.tribunal.is_none() {
            fields.tribunal = Some(tribunal.to_string());
        }

        Some(RawListing::new(
            SourceKind::Vench,
            source_id,
            url,
            row.to_string(),
            fields,
        ))
    }
}
