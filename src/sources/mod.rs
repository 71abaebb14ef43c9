//! Source adapters - one per listing site, dispatched as a fixed set of
//! tagged variants selected by configuration.

pub mod client;
pub mod encheres_publiques;
pub mod licitor;
pub mod throttle;
pub mod vench;

pub use client::SourceClient;
pub use encheres_publiques::EncheresPubliquesAdapter;
pub use licitor::LicitorAdapter;
pub use throttle::Throttle;
pub use vench::VenchAdapter;

use serde::{Deserialize, Serialize};

use crate::error::SourceResult;
use crate::testing::FixtureSource;
use crate::types::config::PipelineConfig;
use crate::types::listing::{RawListing, SourceKind};

/// Query parameters for a source fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceQuery {
    /// Listing pages to walk before stopping
    pub max_pages: usize,
}

impl Default for SourceQuery {
    fn default() -> Self {
        Self { max_pages: 5 }
    }
}

impl SourceQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }
}

/// The fixed set of listing sources. One variant per site plus a fixture
/// variant for offline runs and tests; selection comes from
/// `PipelineConfig::sources`, no runtime subclassing.
pub enum Source {
    Licitor(LicitorAdapter),
    EncheresPubliques(EncheresPubliquesAdapter),
    Vench(VenchAdapter),
    Fixture(FixtureSource),
}

impl Source {
    /// Build the adapter for a configured source kind.
    pub fn for_kind(kind: SourceKind, config: &PipelineConfig) -> Self {
        match kind {
            SourceKind::Licitor => Source::Licitor(LicitorAdapter::new(config)),
            SourceKind::EncheresPubliques => {
                Source::EncheresPubliques(EncheresPubliquesAdapter::new(config))
            }
            SourceKind::Vench => Source::Vench(VenchAdapter::new(config)),
        }
    }

    /// Which source this adapter serves.
    pub fn kind(&self) -> SourceKind {
        match self {
            Source::Licitor(_) => SourceKind::Licitor,
            Source::EncheresPubliques(_) => SourceKind::EncheresPubliques,
            Source::Vench(_) => SourceKind::Vench,
            Source::Fixture(fixture) => fixture.kind(),
        }
    }

    /// Fetch raw listings from this source.
    pub async fn fetch(&self, query: &SourceQuery) -> SourceResult<Vec<RawListing>> {
        match self {
            Source::Licitor(adapter) => adapter.fetch(query).await,
            Source::EncheresPubliques(adapter) => adapter.fetch(query).await,
            Source::Vench(adapter) => adapter.fetch(query).await,
            Source::Fixture(fixture) => fixture.fetch(query).await,
        }
    }
}
