//! Record reconciliation - identity, normalization, and field merging.
//!
//! The merge is the central correctness property of the pipeline: for a
//! fixed set of incoming patches the final record must not depend on
//! arrival order. Every field resolves to the patch that wins a total
//! order over (class priority, retrieval timestamp, origin rank,
//! normalized value), so merging is idempotent and commutative.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::types::config::PipelineConfig;
use crate::types::listing::{AuctionFields, Field, Provenance};
use crate::types::record::{AuctionRecord, DocumentStatus, IdentityKey};

/// Normalize text for comparison and identity derivation: lowercase,
/// fold French accents, punctuation to spaces, collapse whitespace.
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.to_lowercase().chars() {
        let mapped = match c {
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'à' | 'â' | 'ä' => 'a',
            'ù' | 'û' | 'ü' => 'u',
            'ô' | 'ö' => 'o',
            'î' | 'ï' => 'i',
            'ç' => 'c',
            '-' | '\'' | ',' | '.' | ';' | ':' => ' ',
            other => other,
        };
        out.push(mapped);
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Derive the stable identity key from the normalized
/// (address, tribunal, sale date) triple.
pub fn identity_key(
    address: Option<&str>,
    tribunal: Option<&str>,
    sale_date: Option<NaiveDate>,
) -> IdentityKey {
    let mut hasher = Sha256::new();
    hasher.update(normalize_text(address.unwrap_or_default()).as_bytes());
    hasher.update(b"|");
    hasher.update(normalize_text(tribunal.unwrap_or_default()).as_bytes());
    hasher.update(b"|");
    hasher.update(
        sale_date
            .map(|d| d.to_string())
            .unwrap_or_default()
            .as_bytes(),
    );
    IdentityKey::from_hash(format!("{:x}", hasher.finalize()))
}

/// Identity key for a partial field set.
pub fn identity_key_for(fields: &AuctionFields) -> IdentityKey {
    identity_key(
        fields.address.as_deref(),
        fields.tribunal.as_deref(),
        fields.sale_date,
    )
}

/// Total order over competing claims for one field. `Greater` means the
/// incoming patch wins. The raw serialized value is the last tie-breaker
/// so the order is total and merging stays arrival-order independent.
#[allow(clippy::too_many_arguments)]
fn compare_claims(
    incoming: Provenance,
    incoming_key: &str,
    incoming_raw: &str,
    current: Provenance,
    current_key: &str,
    current_raw: &str,
    field: Field,
    config: &PipelineConfig,
) -> Ordering {
    let class = field.class();
    config
        .priority(incoming.origin, class)
        .cmp(&config.priority(current.origin, class))
        .then(incoming.retrieved_at.cmp(&current.retrieved_at))
        .then(incoming.origin.rank().cmp(&current.origin.rank()))
        .then(incoming_key.cmp(current_key))
        .then(incoming_raw.cmp(current_raw))
}

fn merge_field<T, K>(
    current: &mut Option<T>,
    incoming: Option<&T>,
    field: Field,
    provenance: Provenance,
    provenance_map: &mut BTreeMap<Field, Provenance>,
    config: &PipelineConfig,
    key_of: K,
) where
    T: Clone + Serialize,
    K: Fn(&T) -> String,
{
    let Some(incoming_value) = incoming else {
        return;
    };

    let incoming_key = key_of(incoming_value);

    let wins = match (&current, provenance_map.get(&field)) {
        (Some(current_value), Some(current_prov)) => {
            let current_key = key_of(current_value);
            compare_claims(
                provenance,
                &incoming_key,
                &json_key(incoming_value),
                *current_prov,
                &current_key,
                &json_key(current_value),
                field,
                config,
            ) == Ordering::Greater
        }
        // Value present but unattributed (computed or pre-seeded): any
        // provenanced claim supersedes it
        (Some(_), None) => true,
        (None, _) => true,
    };

    if wins {
        *current = Some(incoming_value.clone());
        provenance_map.insert(field, provenance);
    }
}

/// Stable comparison key for values without domain normalization.
fn json_key<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// Merge an incoming patch into a record.
///
/// If `existing` is `None` a fresh record is created for `key`. The
/// result does not depend on the order patches arrive in, only on their
/// provenance and timestamps.
pub fn merge(
    existing: Option<AuctionRecord>,
    key: &IdentityKey,
    patch: &AuctionFields,
    provenance: Provenance,
    config: &PipelineConfig,
) -> AuctionRecord {
    let mut record = existing.unwrap_or_else(|| AuctionRecord::new(key.clone()));

    // Split borrows: the provenance map is threaded through every field
    let mut provenance_map = std::mem::take(&mut record.provenance);

    {
        let text = |v: &String| normalize_text(v);
        let raw = |v: &String| v.trim().to_string();

        merge_field(
            &mut record.address,
            patch.address.as_ref(),
            Field::Address,
            provenance,
            &mut provenance_map,
            config,
            text,
        );
        merge_field(
            &mut record.postal_code,
            patch.postal_code.as_ref(),
            Field::PostalCode,
            provenance,
            &mut provenance_map,
            config,
            raw,
        );
        merge_field(
            &mut record.city,
            patch.city.as_ref(),
            Field::City,
            provenance,
            &mut provenance_map,
            config,
            text,
        );
        merge_field(
            &mut record.property_type,
            patch.property_type.as_ref(),
            Field::PropertyType,
            provenance,
            &mut provenance_map,
            config,
            json_key,
        );
        merge_field(
            &mut record.surface,
            patch.surface.as_ref(),
            Field::Surface,
            provenance,
            &mut provenance_map,
            config,
            json_key,
        );
        merge_field(
            &mut record.rooms,
            patch.rooms.as_ref(),
            Field::Rooms,
            provenance,
            &mut provenance_map,
            config,
            json_key,
        );
        merge_field(
            &mut record.floor,
            patch.floor.as_ref(),
            Field::Floor,
            provenance,
            &mut provenance_map,
            config,
            json_key,
        );
        merge_field(
            &mut record.starting_price,
            patch.starting_price.as_ref(),
            Field::StartingPrice,
            provenance,
            &mut provenance_map,
            config,
            json_key,
        );
        merge_field(
            &mut record.sale_date,
            patch.sale_date.as_ref(),
            Field::SaleDate,
            provenance,
            &mut provenance_map,
            config,
            json_key,
        );
        merge_field(
            &mut record.sale_time,
            patch.sale_time.as_ref(),
            Field::SaleTime,
            provenance,
            &mut provenance_map,
            config,
            raw,
        );
        merge_field(
            &mut record.tribunal,
            patch.tribunal.as_ref(),
            Field::Tribunal,
            provenance,
            &mut provenance_map,
            config,
            text,
        );
        merge_field(
            &mut record.lawyer_name,
            patch.lawyer_name.as_ref(),
            Field::LawyerName,
            provenance,
            &mut provenance_map,
            config,
            text,
        );
        merge_field(
            &mut record.lawyer_contact,
            patch.lawyer_contact.as_ref(),
            Field::LawyerContact,
            provenance,
            &mut provenance_map,
            config,
            raw,
        );
        merge_field(
            &mut record.document_url,
            patch.document_url.as_ref(),
            Field::DocumentUrl,
            provenance,
            &mut provenance_map,
            config,
            raw,
        );
        merge_field(
            &mut record.occupation,
            patch.occupation.as_ref(),
            Field::Occupation,
            provenance,
            &mut provenance_map,
            config,
            text,
        );
        merge_field(
            &mut record.description,
            patch.description.as_ref(),
            Field::Description,
            provenance,
            &mut provenance_map,
            config,
            text,
        );
        merge_field(
            &mut record.case_number,
            patch.case_number.as_ref(),
            Field::CaseNumber,
            provenance,
            &mut provenance_map,
            config,
            raw,
        );
    }

    record.provenance = provenance_map;

    // Visit dates merge as a sorted set union
    if !patch.visit_dates.is_empty() {
        record.visit_dates.extend(patch.visit_dates.iter().copied());
        record.visit_dates.sort();
        record.visit_dates.dedup();
    }

    // A document URL without prior document state means extraction is due
    if record.document_url.is_some() && record.document_status == DocumentStatus::NotFound {
        record.document_status = DocumentStatus::Pending;
    }

    enrich(&mut record);
    record.updated_at = Utc::now();
    record
}

/// Note the listing-page URL a record was seen at. Kept as a sorted set
/// so unions commute.
pub fn note_listing_url(record: &mut AuctionRecord, url: &str) {
    if !record.listing_urls.iter().any(|u| u == url) {
        record.listing_urls.push(url.to_string());
        record.listing_urls.sort();
    }
}

/// Postal-code enrichment: the department is always derived from the
/// current district code, so it tracks whichever postal code wins the
/// merge and stays independent of arrival order.
fn enrich(record: &mut AuctionRecord) {
    if let Some(postal) = &record.postal_code {
        if postal.len() == 5 && postal.chars().all(|c| c.is_ascii_digit()) {
            record.department = Some(postal[..2].to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::listing::{Origin, SourceKind};
    use chrono::{DateTime, TimeZone};

    fn ts(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
    }

    fn listing(kind: SourceKind, seconds: i64) -> Provenance {
        Provenance::new(Origin::Listing(kind), ts(seconds))
    }

    /// Record content minus volatile bookkeeping, for order-independence
    /// comparisons.
    fn fingerprint(record: &AuctionRecord) -> serde_json::Value {
        let mut value = serde_json::to_value(record).unwrap();
        let map = value.as_object_mut().unwrap();
        map.remove("created_at");
        map.remove("updated_at");
        map.remove("version");
        value
    }

    #[test]
    fn normalize_folds_accents_and_punctuation() {
        assert_eq!(
            normalize_text("12, Rue de l'Église  -  PARIS"),
            "12 rue de l eglise paris"
        );
    }

    #[test]
    fn same_triple_same_key() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 12);
        let a = identity_key(Some("12 Rue Oberkampf"), Some("TJ de Paris"), date);
        let b = identity_key(Some("12, rue OBERKAMPF"), Some("tj de paris"), date);
        assert_eq!(a, b);

        let other = identity_key(Some("13 Rue Oberkampf"), Some("TJ de Paris"), date);
        assert_ne!(a, other);
    }

    #[test]
    fn absent_takes_incoming() {
        let config = PipelineConfig::default();
        let patch = AuctionFields::new().with_surface(45.0);
        let key = identity_key_for(&patch);
        let record = merge(
            None,
            &key,
            &patch,
            listing(SourceKind::Vench, 0),
            &config,
        );
        assert_eq!(record.surface, Some(45.0));
        assert!(record.provenance.contains_key(&Field::Surface));
    }

    #[test]
    fn document_overrules_listing_surface() {
        let config = PipelineConfig::default();
        let key = IdentityKey::from_hash("k");

        let from_listing = AuctionFields::new().with_surface(45.0);
        let from_doc = AuctionFields::new().with_surface(52.5);

        let record = merge(
            None,
            &key,
            &from_listing,
            listing(SourceKind::Licitor, 100),
            &config,
        );
        // Document patch is older but still wins on class priority
        let record = merge(
            Some(record),
            &key,
            &from_doc,
            Provenance::new(Origin::Document, ts(0)),
            &config,
        );
        assert_eq!(record.surface, Some(52.5));

        // A later listing sighting does not claw the field back
        let record = merge(
            Some(record),
            &key,
            &from_listing,
            listing(SourceKind::Licitor, 200),
            &config,
        );
        assert_eq!(record.surface, Some(52.5));
    }

    #[test]
    fn priority_tie_goes_to_later_retrieval() {
        let config = PipelineConfig::default();
        let key = IdentityKey::from_hash("k");
        let early = AuctionFields::new().with_starting_price(100_000.0);
        let late = AuctionFields::new().with_starting_price(120_000.0);

        let record = merge(
            None,
            &key,
            &early,
            listing(SourceKind::Licitor, 0),
            &config,
        );
        let record = merge(
            Some(record),
            &key,
            &late,
            listing(SourceKind::Licitor, 60),
            &config,
        );
        assert_eq!(record.starting_price, Some(120_000.0));
    }

    #[test]
    fn merge_is_commutative() {
        let config = PipelineConfig::default();
        let key = IdentityKey::from_hash("k");

        let a = AuctionFields {
            address: Some("12 rue Oberkampf".into()),
            surface: Some(45.0),
            starting_price: Some(150_000.0),
            ..Default::default()
        };
        let b = AuctionFields {
            address: Some("12, RUE OBERKAMPF".into()),
            surface: Some(47.0),
            postal_code: Some("75011".into()),
            ..Default::default()
        };
        let pa = listing(SourceKind::Licitor, 0);
        let pb = listing(SourceKind::EncheresPubliques, 30);

        let ab = merge(
            Some(merge(None, &key, &a, pa, &config)),
            &key,
            &b,
            pb,
            &config,
        );
        let ba = merge(
            Some(merge(None, &key, &b, pb, &config)),
            &key,
            &a,
            pa,
            &config,
        );

        assert_eq!(fingerprint(&ab), fingerprint(&ba));
        // Within the Listings group, licitor outranks encheres_publiques
        assert_eq!(ab.surface, Some(45.0));
        assert_eq!(ab.postal_code, Some("75011".into()));
    }

    #[test]
    fn merge_is_idempotent() {
        let config = PipelineConfig::default();
        let key = IdentityKey::from_hash("k");
        let patch = AuctionFields::new()
            .with_address("3 avenue Jean Jaurès")
            .with_surface(60.0);
        let prov = listing(SourceKind::Vench, 10);

        let once = merge(None, &key, &patch, prov, &config);
        let twice = merge(Some(once.clone()), &key, &patch, prov, &config);
        assert_eq!(fingerprint(&once), fingerprint(&twice));
    }

    #[test]
    fn visit_dates_union_sorted() {
        let config = PipelineConfig::default();
        let key = IdentityKey::from_hash("k");
        let d1 = NaiveDate::from_ymd_opt(2026, 2, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let d2 = NaiveDate::from_ymd_opt(2026, 2, 8)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();

        let a = AuctionFields {
            visit_dates: vec![d2, d1],
            ..Default::default()
        };
        let b = AuctionFields {
            visit_dates: vec![d1],
            ..Default::default()
        };

        let record = merge(None, &key, &a, listing(SourceKind::Licitor, 0), &config);
        let record = merge(
            Some(record),
            &key,
            &b,
            listing(SourceKind::Vench, 1),
            &config,
        );
        assert_eq!(record.visit_dates, vec![d1, d2]);
    }

    #[test]
    fn document_url_marks_extraction_pending() {
        let config = PipelineConfig::default();
        let key = IdentityKey::from_hash("k");
        let patch = AuctionFields::new().with_document_url("https://example.com/pv.pdf");
        let record = merge(None, &key, &patch, listing(SourceKind::Licitor, 0), &config);
        assert_eq!(record.document_status, DocumentStatus::Pending);
    }

    #[test]
    fn department_inferred_from_postal_code() {
        let config = PipelineConfig::default();
        let key = IdentityKey::from_hash("k");
        let patch = AuctionFields::new().with_postal_code("93200");
        let record = merge(None, &key, &patch, listing(SourceKind::Licitor, 0), &config);
        assert_eq!(record.department, Some("93".into()));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn field_set_strategy() -> impl Strategy<Value = AuctionFields> {
            (
                proptest::option::of("[a-z ]{1,12}"),
                proptest::option::of(prop_oneof![
                    Just("75011".to_string()),
                    Just("93200".to_string())
                ]),
                proptest::option::of(10.0..200.0f64),
                proptest::option::of(50_000.0..900_000.0f64),
            )
                .prop_map(|(address, postal_code, surface, starting_price)| AuctionFields {
                    address,
                    postal_code,
                    surface,
                    starting_price,
                    ..Default::default()
                })
        }

        fn provenance_strategy() -> impl Strategy<Value = Provenance> {
            (
                prop_oneof![
                    Just(Origin::Listing(SourceKind::Licitor)),
                    Just(Origin::Listing(SourceKind::EncheresPubliques)),
                    Just(Origin::Listing(SourceKind::Vench)),
                    Just(Origin::Document),
                    Just(Origin::Assist),
                ],
                0i64..300,
            )
                .prop_map(|(origin, seconds)| Provenance::new(origin, ts(seconds)))
        }

        proptest! {
            #[test]
            fn merge_order_never_matters(
                a in field_set_strategy(),
                b in field_set_strategy(),
                c in field_set_strategy(),
                pa in provenance_strategy(),
                pb in provenance_strategy(),
                pc in provenance_strategy(),
            ) {
                let config = PipelineConfig::default();
                let key = IdentityKey::from_hash("k");

                let patches = [(&a, pa), (&b, pb), (&c, pc)];
                let orders = [[0, 1, 2], [2, 1, 0], [1, 0, 2], [2, 0, 1]];

                let mut outcomes = orders.iter().map(|order| {
                    let mut record = None;
                    for &i in order {
                        let (fields, prov) = patches[i];
                        record = Some(merge(record, &key, fields, prov, &config));
                    }
                    fingerprint(&record.unwrap())
                });

                let first = outcomes.next().unwrap();
                for outcome in outcomes {
                    prop_assert_eq!(&first, &outcome);
                }
            }
        }
    }
}
