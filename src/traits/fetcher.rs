//! Document fetching and the lawyer/document directory collaborator.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{DocumentError, DocumentResult};
use crate::types::record::AuctionRecord;

/// Fetches document bytes (PV PDFs) by URL.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch_document(&self, url: &str) -> DocumentResult<Vec<u8>>;
}

/// Lawyer/document collaborator: candidate document URLs for a record
/// whose sources did not link a PV directly.
#[async_trait]
pub trait DocumentDirectory: Send + Sync {
    async fn documents_for(&self, record: &AuctionRecord) -> DocumentResult<Vec<String>>;
}

/// A directory that knows no documents.
pub struct NoDirectory;

#[async_trait]
impl DocumentDirectory for NoDirectory {
    async fn documents_for(&self, _record: &AuctionRecord) -> DocumentResult<Vec<String>> {
        Ok(Vec::new())
    }
}

/// HTTP document fetcher.
pub struct HttpDocumentFetcher {
    client: reqwest::Client,
    user_agent: String,
}

impl Default for HttpDocumentFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpDocumentFetcher {
    /// Create a fetcher with default settings.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .expect("Failed to create HTTP client"),
            user_agent: "encheres-bot/0.1".to_string(),
        }
    }

    /// Set a custom user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set a custom HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl DocumentFetcher for HttpDocumentFetcher {
    async fn fetch_document(&self, url: &str) -> DocumentResult<Vec<u8>> {
        debug!(url = %url, "fetching document");
        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "document request failed");
                DocumentError::Http(Box::new(e))
            })?;

        if !response.status().is_success() {
            return Err(DocumentError::Unavailable {
                url: url.to_string(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DocumentError::Http(Box::new(e)))?;

        Ok(bytes.to_vec())
    }
}
