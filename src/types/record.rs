//! The canonical auction record and its identity key.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::listing::{Field, Provenance};

/// Property category, aligned with the DVF `type_local` taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Apartment,
    House,
    Commercial,
    Land,
    Parking,
    Other,
}

impl PropertyType {
    /// DVF `type_local` label for comparable filtering.
    pub fn dvf_label(&self) -> &'static str {
        match self {
            PropertyType::Apartment => "Appartement",
            PropertyType::House => "Maison",
            PropertyType::Commercial => "Local industriel. commercial ou assimilé",
            PropertyType::Land => "Terrain",
            PropertyType::Parking => "Dépendance",
            PropertyType::Other => "Appartement",
        }
    }

    /// Whether transactions of `other` are usable comparables for `self`.
    pub fn comparable_with(&self, other: PropertyType) -> bool {
        match (self, other) {
            (PropertyType::Other, _) | (_, PropertyType::Other) => true,
            (a, b) => *a == b,
        }
    }
}

/// Lifecycle of the legal document (PV) attached to an auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// No document URL is known yet
    #[default]
    NotFound,
    /// A URL is known but the document has not been extracted
    Pending,
    /// Extraction succeeded
    Extracted,
    /// Neither the text layer nor OCR recovered usable text
    ExtractionFailed,
}

/// Stable identity of an auction, derived from the normalized
/// (address, tribunal, sale date) triple. Two raw listings with the same
/// key reconcile into one record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    /// Wrap an already-derived key. Use `reconcile::identity_key` to
    /// derive one from record fields.
    pub fn from_hash(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The canonical auction entity. Created on first sighting by any adapter,
/// mutated only through the reconciler's merge and the scorer's write-back,
/// never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionRecord {
    pub key: IdentityKey,

    // Location
    pub address: Option<String>,
    /// Postal code; doubles as the geographic district code used for
    /// market comparison
    pub postal_code: Option<String>,
    pub city: Option<String>,
    /// First two digits of the postal code
    pub department: Option<String>,

    // Property
    pub property_type: Option<PropertyType>,
    /// Surface in m²
    pub surface: Option<f64>,
    pub rooms: Option<u32>,
    pub floor: Option<i32>,
    pub occupation: Option<String>,
    pub description: Option<String>,

    // Sale
    /// Mise à prix in euros
    pub starting_price: Option<f64>,
    pub sale_date: Option<NaiveDate>,
    pub sale_time: Option<String>,
    /// Sorted, deduplicated visit slots
    #[serde(default)]
    pub visit_dates: Vec<NaiveDateTime>,
    pub tribunal: Option<String>,
    pub lawyer_name: Option<String>,
    pub lawyer_contact: Option<String>,
    pub case_number: Option<String>,

    // Document
    pub document_status: DocumentStatus,
    pub document_url: Option<String>,

    // Source material
    /// Listing-page URLs this record was seen at, across sources
    #[serde(default)]
    pub listing_urls: Vec<String>,

    // Computed by the analysis stage
    pub market_price_m2: Option<f64>,
    pub sale_price_m2: Option<f64>,
    pub discount_percent: Option<f64>,
    /// 0-100
    pub opportunity_score: Option<f64>,

    /// Winning provenance per populated field
    #[serde(default)]
    pub provenance: BTreeMap<Field, Provenance>,

    /// Optimistic-concurrency counter, bumped by the store on each upsert
    pub version: u64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AuctionRecord {
    /// Create an empty record for a key.
    pub fn new(key: IdentityKey) -> Self {
        let now = Utc::now();
        Self {
            key,
            address: None,
            postal_code: None,
            city: None,
            department: None,
            property_type: None,
            surface: None,
            rooms: None,
            floor: None,
            occupation: None,
            description: None,
            starting_price: None,
            sale_date: None,
            sale_time: None,
            visit_dates: Vec::new(),
            tribunal: None,
            lawyer_name: None,
            lawyer_contact: None,
            case_number: None,
            document_status: DocumentStatus::default(),
            document_url: None,
            listing_urls: Vec::new(),
            market_price_m2: None,
            sale_price_m2: None,
            discount_percent: None,
            opportunity_score: None,
            provenance: BTreeMap::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Asking price per m², when both price and surface are known.
    pub fn price_per_m2(&self) -> Option<f64> {
        match (self.starting_price, self.surface) {
            (Some(price), Some(surface)) if surface > 0.0 => Some(price / surface),
            _ => None,
        }
    }

    /// District code used for comparable selection.
    pub fn district(&self) -> Option<&str> {
        self.postal_code.as_deref()
    }

    /// True once the analysis stage has produced a score.
    pub fn is_scored(&self) -> bool {
        self.opportunity_score.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_per_m2_requires_both_fields() {
        let mut record = AuctionRecord::new(IdentityKey::from_hash("k"));
        assert_eq!(record.price_per_m2(), None);

        record.starting_price = Some(200_000.0);
        assert_eq!(record.price_per_m2(), None);

        record.surface = Some(50.0);
        assert_eq!(record.price_per_m2(), Some(4000.0));
    }

    #[test]
    fn property_type_compatibility() {
        assert!(PropertyType::Apartment.comparable_with(PropertyType::Apartment));
        assert!(!PropertyType::Apartment.comparable_with(PropertyType::House));
        assert!(PropertyType::Other.comparable_with(PropertyType::Parking));
    }
}
