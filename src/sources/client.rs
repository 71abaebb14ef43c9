//! Shared HTTP client for source adapters: throttled fetches with
//! retry and exponential backoff.

use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{SourceError, SourceResult};
use crate::sources::throttle::Throttle;
use crate::types::config::PipelineConfig;
use crate::types::listing::SourceKind;

/// Throttled, retrying HTTP client. Each source gets its own instance so
/// the minimum interval applies per source.
pub struct SourceClient {
    client: reqwest::Client,
    throttle: Throttle,
    user_agent: String,
    max_retries: u32,
}

impl SourceClient {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.http_timeout_secs))
                .build()
                .expect("Failed to create HTTP client"),
            throttle: Throttle::from_interval_ms(config.request_min_interval_ms),
            user_agent: config.user_agent.clone(),
            max_retries: config.max_retries,
        }
    }

    /// Fetch a page body, retrying transient failures with exponential
    /// backoff before declaring the source unavailable.
    pub async fn get_text(&self, source: SourceKind, url: &str) -> SourceResult<String> {
        for attempt in 0..self.max_retries {
            self.throttle.acquire().await;

            debug!(source = %source, url = %url, attempt, "fetching listing page");
            match self.try_get(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    warn!(
                        source = %source,
                        url = %url,
                        attempt = attempt + 1,
                        retries = self.max_retries,
                        error = %e,
                        "fetch attempt failed"
                    );
                    if attempt + 1 < self.max_retries {
                        tokio::time::sleep(Duration::from_millis(500 * 2u64.pow(attempt))).await;
                    }
                }
            }
        }

        Err(SourceError::Unavailable {
            detail: source.to_string(),
        })
    }

    async fn try_get(&self, url: &str) -> SourceResult<String> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .header("Accept-Language", "fr-FR,fr;q=0.9,en;q=0.8")
            .send()
            .await
            .map_err(|e| SourceError::Http(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Http(Box::new(std::io::Error::other(
                format!("HTTP {status}"),
            ))));
        }

        response
            .text()
            .await
            .map_err(|e| SourceError::Http(Box::new(e)))
    }
}

/// Resolve a possibly-relative href against a site base URL.
pub fn resolve_href(base: &str, href: &str) -> Option<String> {
    url::Url::parse(base)
        .ok()?
        .join(href)
        .ok()
        .map(|resolved| resolved.to_string())
}

/// Strip HTML tags and collapse whitespace, for running text rules over
/// listing snippets.
pub fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => {
                in_tag = true;
                out.push(' ');
            }
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    let decoded = out
        .replace("&amp;", "&")
        .replace("&nbsp;", " ")
        .replace("&#39;", "'")
        .replace("&eacute;", "é")
        .replace("&egrave;", "è")
        .replace("&agrave;", "à");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_tags_flattens_markup() {
        let html = "<div class=\"lot\"><h2>Appartement</h2> <p>45&nbsp;m&#178;</p></div>";
        assert_eq!(strip_tags(html), "Appartement 45 m&#178;");
    }

    #[test]
    fn strip_tags_decodes_common_entities() {
        assert_eq!(strip_tags("Mise &agrave; prix"), "Mise à prix");
    }

    #[test]
    fn resolve_href_joins_relative_and_keeps_absolute() {
        assert_eq!(
            resolve_href("https://www.licitor.com", "/documents/pv.pdf").as_deref(),
            Some("https://www.licitor.com/documents/pv.pdf")
        );
        assert_eq!(
            resolve_href("https://www.licitor.com", "https://cdn.example.com/pv.pdf").as_deref(),
            Some("https://cdn.example.com/pv.pdf")
        );
    }
}
