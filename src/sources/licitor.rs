//! Licitor adapter - judicial sale listings grouped by tribunal.

use regex::Regex;
use tracing::{info, warn};

use crate::error::SourceResult;
use crate::extract::FieldExtractor;
use crate::sources::client::{resolve_href, strip_tags, SourceClient};
use crate::sources::SourceQuery;
use crate::types::config::PipelineConfig;
use crate::types::listing::{RawListing, SourceKind};

const BASE_URL: &str = "https://www.licitor.com";

/// Adapter for licitor.com listing pages.
pub struct LicitorAdapter {
    client: SourceClient,
    base_url: String,
    regions: Vec<String>,
    item_pattern: Regex,
    link_pattern: Regex,
    pdf_pattern: Regex,
    fields: FieldExtractor,
}

impl LicitorAdapter {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            client: SourceClient::new(config),
            base_url: BASE_URL.to_string(),
            regions: config.regions.clone(),
            item_pattern: Regex::new(r#"(?s)<article[^>]*class="[^"]*annonce[^"]*"[^>]*>(.*?)</article>"#)
                .unwrap(),
            link_pattern: Regex::new(r#"href="(/ventes-judiciaires[^"]*?-(\d+)\.html?)""#).unwrap(),
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
        format!(
            "{}/ventes-judiciaires-immobilieres?page={}",
            self.base_url, page
        )
    }

    /// Fetch listing pages until one comes back empty or the page budget
    /// is spent.
    pub async fn fetch(&self, query: &SourceQuery) -> SourceResult<Vec<RawListing>> {
        let mut listings = Vec::new();

        for page in 1..=query.max_pages {
            let html = self
                .client
                .get_text(SourceKind::Licitor, &self.listing_url(page))
                .await?;

            let page_listings = self.parse_page(&html);
            if page_listings.is_empty() {
                break;
            }
            listings.extend(page_listings);
        }

        info!(source = "licitor", count = listings.len(), "fetch complete");
        Ok(listings)
    }

    /// Parse one listing page. A malformed item is logged and skipped;
    /// it never aborts the remaining items.
    pub fn parse_page(&self, html: &str) -> Vec<RawListing> {
        let mut listings = Vec::new();

        for (index, caps) in self.item_pattern.captures_iter(html).enumerate() {
            let snippet = &caps[1];
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
                    warn!(source = "licitor", index, "skipping unparseable listing");
                }
            }
        }

        listings
    }

    fn parse_item(&self, snippet: &str) -> Option<RawListing> {
        let link = self.link_pattern.captures(snippet)?;
        let url = resolve_href(&self.base_url, &link[1])?;
        let source_id = link[2].to_string();

        let text = strip_tags(snippet);
        let mut fields = self.fields.extract(&text).fields;

        if let Some(pdf) = self.pdf_pattern.captures(snippet) {
            fields.document_url = resolve_href(&self.base_url, &pdf[1]);
        }

        Some(RawListing::new(
            SourceKind::Licitor,
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const PAGE: &str = r#"
<html><body>
<article class="annonce">
  <h2><a href="/ventes-judiciaires-immobilieres/paris/appartement-oberkampf-12345.html">Appartement 3 pièces</a></h2>
  <p>Un appartement situé au 12 rue Oberkampf, 75011 Paris, d'une surface de 45,5 m²</p>
  <p>Mise à prix : 185 000 € — Adjudication le 12/03/2026 à 14h00</p>
  <p>Tribunal Judiciaire de Paris</p>
  <a href="/documents/pv-12345.pdf">Procès-verbal</a>
</article>
<article class="annonce">
  <h2>Annonce incomplète sans lien</h2>
</article>
<article class="annonce">
  <h2><a href="/ventes-judiciaires-immobilieres/marseille/maison-13008-99999.html">Maison</a></h2>
  <p>Une maison située au 4 chemin des Goudes, 13008 Marseille, surface de 90 m²</p>
</article>
</body></html>
"#;

    fn adapter() -> LicitorAdapter {
        LicitorAdapter::new(&PipelineConfig::default())
    }

    #[test]
    fn parses_listing_and_skips_broken_item() {
        let listings = adapter().parse_page(PAGE);

        // Broken item skipped, Marseille out of scope for Paris regions
        assert_eq!(listings.len(), 1);
        let listing = &listings[0];
        assert_eq!(listing.source, SourceKind::Licitor);
        assert_eq!(listing.source_id, "12345");
        assert_eq!(
            listing.fields.address.as_deref(),
            Some("12 rue Oberkampf")
        );
        assert_eq!(listing.fields.postal_code.as_deref(), Some("75011"));
        assert_eq!(listing.fields.surface, Some(45.5));
        assert_eq!(listing.fields.starting_price, Some(185_000.0));
        assert_eq!(
            listing.fields.sale_date,
            NaiveDate::from_ymd_opt(2026, 3, 12)
        );
        assert_eq!(
            listing.fields.document_url.as_deref(),
            Some("https://www.licitor.com/documents/pv-12345.pdf")
        );
    }

    #[test]
    fn out_of_scope_region_is_kept_when_configured() {
        let config = PipelineConfig::default().with_regions(["13"]);
        let listings = LicitorAdapter::new(&config).parse_page(PAGE);
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].fields.postal_code.as_deref(), Some("13008"));
    }
}
