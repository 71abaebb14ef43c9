//! Listing types - raw captures, partial field sets, and provenance.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::record::PropertyType;

/// A listing source site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Licitor,
    EncheresPubliques,
    Vench,
}

impl SourceKind {
    /// Stable name used in logs and provenance.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Licitor => "licitor",
            SourceKind::EncheresPubliques => "encheres_publiques",
            SourceKind::Vench => "vench",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a field value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Parsed from a source's listing page
    Listing(SourceKind),
    /// Extracted from a legal document (PV)
    Document,
    /// Filled in by the language-model-assisted extractor
    Assist,
}

impl Origin {
    /// Fixed total order over origins, used as the final deterministic
    /// tie-breaker so merges do not depend on arrival order.
    pub fn rank(&self) -> u8 {
        match self {
            Origin::Document => 200,
            // Listing sources keep their relative order stable
            Origin::Listing(SourceKind::Licitor) => 103,
            Origin::Listing(SourceKind::EncheresPubliques) => 102,
            Origin::Listing(SourceKind::Vench) => 101,
            Origin::Assist => 0,
        }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Listing(kind) => write!(f, "listing:{kind}"),
            Origin::Document => f.write_str("document"),
            Origin::Assist => f.write_str("assist"),
        }
    }
}

/// Provenance of a field value or an incoming patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub origin: Origin,
    pub retrieved_at: DateTime<Utc>,
}

impl Provenance {
    pub fn new(origin: Origin, retrieved_at: DateTime<Utc>) -> Self {
        Self {
            origin,
            retrieved_at,
        }
    }
}

/// The canonical record fields, for provenance tracking and per-class
/// merge priorities.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Address,
    PostalCode,
    City,
    PropertyType,
    Surface,
    Rooms,
    Floor,
    StartingPrice,
    SaleDate,
    SaleTime,
    Tribunal,
    LawyerName,
    LawyerContact,
    DocumentUrl,
    Occupation,
    Description,
    CaseNumber,
}

impl Field {
    /// Merge-priority class of this field.
    pub fn class(&self) -> FieldClass {
        match self {
            Field::DocumentUrl => FieldClass::Urls,
            _ => FieldClass::Facts,
        }
    }
}

/// Field classes with independently configurable source priorities.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FieldClass {
    /// Property/legal facts - documents outrank listing pages
    Facts,
    /// URLs pointing at source material - listing pages outrank documents
    Urls,
}

/// Confidence tag attached to an extracted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// A pattern rule matched and the assist path agreed
    Confirmed,
    /// A pattern rule matched
    Pattern,
    /// Only the assist path produced the value
    Assist,
}

/// A partial auction field set. Every field is independently nullable;
/// adapters, the field extractor, and the assist extractor each produce
/// one of these, and the reconciler merges them into an `AuctionRecord`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuctionFields {
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub property_type: Option<PropertyType>,
    /// Surface in m²
    pub surface: Option<f64>,
    pub rooms: Option<u32>,
    pub floor: Option<i32>,
    /// Mise à prix in euros
    pub starting_price: Option<f64>,
    pub sale_date: Option<NaiveDate>,
    /// "14h30" style, as printed by the sources
    pub sale_time: Option<String>,
    /// Scheduled visit slots; merged as a sorted set union
    #[serde(default)]
    pub visit_dates: Vec<NaiveDateTime>,
    pub tribunal: Option<String>,
    pub lawyer_name: Option<String>,
    pub lawyer_contact: Option<String>,
    pub document_url: Option<String>,
    pub occupation: Option<String>,
    pub description: Option<String>,
    /// RG case number, e.g. "23/00123"
    pub case_number: Option<String>,
}

impl AuctionFields {
    /// Create an empty field set.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no field is set and no visit dates are known.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_postal_code(mut self, postal_code: impl Into<String>) -> Self {
        self.postal_code = Some(postal_code.into());
        self
    }

    pub fn with_surface(mut self, surface: f64) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn with_starting_price(mut self, price: f64) -> Self {
        self.starting_price = Some(price);
        self
    }

    pub fn with_sale_date(mut self, date: NaiveDate) -> Self {
        self.sale_date = Some(date);
        self
    }

    pub fn with_tribunal(mut self, tribunal: impl Into<String>) -> Self {
        self.tribunal = Some(tribunal.into());
        self
    }

    pub fn with_document_url(mut self, url: impl Into<String>) -> Self {
        self.document_url = Some(url.into());
        self
    }
}

/// A raw listing captured from one source. Immutable once captured;
/// owned by its adapter until handed to the reconciler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawListing {
    /// Capture identifier
    pub id: Uuid,

    /// Which source produced this capture
    pub source: SourceKind,

    /// Listing id on the source site, when the site exposes one
    pub source_id: String,

    /// Listing page URL
    pub url: String,

    /// Raw HTML snapshot of the listing
    pub html: String,

    /// When the listing was fetched
    pub retrieved_at: DateTime<Utc>,

    /// Fields the adapter parsed out of the snapshot
    pub fields: AuctionFields,
}

impl RawListing {
    /// Create a new capture with a fresh id, stamped now.
    pub fn new(
        source: SourceKind,
        source_id: impl Into<String>,
        url: impl Into<String>,
        html: impl Into<String>,
        fields: AuctionFields,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            source_id: source_id.into(),
            url: url.into(),
            html: html.into(),
            retrieved_at: Utc::now(),
            fields,
        }
    }

    /// Set the retrieval timestamp.
    pub fn with_retrieved_at(mut self, retrieved_at: DateTime<Utc>) -> Self {
        self.retrieved_at = retrieved_at;
        self
    }

    /// Provenance for this capture's fields.
    pub fn provenance(&self) -> Provenance {
        Provenance::new(Origin::Listing(self.source), self.retrieved_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_rank_orders_document_over_listings_over_assist() {
        assert!(Origin::Document.rank() > Origin::Listing(SourceKind::Licitor).rank());
        assert!(Origin::Listing(SourceKind::Vench).rank() > Origin::Assist.rank());
    }

    #[test]
    fn empty_fields() {
        assert!(AuctionFields::new().is_empty());
        assert!(!AuctionFields::new().with_surface(42.0).is_empty());
    }
}
