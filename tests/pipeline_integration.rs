//! Integration tests for the full auction pipeline.
//!
//! These tests drive the real orchestrator over fixture sources and
//! mock collaborators:
//! 1. Ingest from multiple sources
//! 2. Deduplicate into canonical records
//! 3. Extract the PV document
//! 4. Compare against the market and score

use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use encheres::{
    testing::{FixedTextLayer, MockDocumentFetcher, MockMarketData},
    AuctionFields, AuctionRecord, ComparableTransaction, DocumentConfig, DocumentExtractor,
    DocumentStatus, MemoryStore, Pipeline, PipelineConfig, PropertyType, RawListing, RecordStore,
    Source, SourceKind, Tier,
};

const PV_URL: &str = "https://docs.example.com/pv-12345.pdf";

fn sale_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 12).unwrap()
}

/// PV text long and clean enough to pass the content thresholds, carrying
/// the authoritative surface.
fn pv_text() -> String {
    let body = "Vente aux enchères publiques sur saisie immobilière. \
        Un appartement situé au 12 rue Oberkampf, 75011 Paris, \
        d'une surface de 46,25 m², libre de toute occupation. \
        Le bien dépend d'un immeuble en copropriété. ";
    format!("{}{}", body.repeat(2), "Mise à prix : 185 000 €.")
}

fn licitor_listing() -> RawListing {
    let fields = AuctionFields {
        address: Some("12 rue Oberkampf".into()),
        postal_code: Some("75011".into()),
        city: Some("Paris".into()),
        property_type: Some(PropertyType::Apartment),
        surface: Some(45.0),
        starting_price: Some(185_000.0),
        sale_date: Some(sale_date()),
        tribunal: Some("Tribunal Judiciaire de Paris".into()),
        document_url: Some(PV_URL.into()),
        ..Default::default()
    };
    RawListing::new(
        SourceKind::Licitor,
        "12345",
        "https://www.licitor.com/vente/12345",
        "<article/>",
        fields,
    )
    .with_retrieved_at(Utc.with_ymd_and_hms(2026, 1, 10, 8, 0, 0).unwrap())
}

/// The same auction as seen by the second source: same normalized
/// identity triple, noisier fields, no document link.
fn encheres_listing() -> RawListing {
    let fields = AuctionFields {
        address: Some("12, RUE OBERKAMPF".into()),
        postal_code: Some("75011".into()),
        property_type: Some(PropertyType::Apartment),
        surface: Some(44.0),
        starting_price: Some(185_000.0),
        sale_date: Some(sale_date()),
        tribunal: Some("tribunal judiciaire de PARIS".into()),
        ..Default::default()
    };
    RawListing::new(
        SourceKind::EncheresPubliques,
        "88201",
        "https://www.encheres-publiques.com/lot/88201",
        "<div/>",
        fields,
    )
    .with_retrieved_at(Utc.with_ymd_and_hms(2026, 1, 11, 8, 0, 0).unwrap())
}

fn fixture_sources() -> Vec<Source> {
    vec![
        Source::Fixture(
            encheres::testing::FixtureSource::new(SourceKind::Licitor)
                .with_listing(licitor_listing()),
        ),
        Source::Fixture(
            encheres::testing::FixtureSource::new(SourceKind::EncheresPubliques)
                .with_listing(encheres_listing()),
        ),
    ]
}

/// Five recent sales at 5 000 €/m² in the same district.
fn market_at_5000() -> MockMarketData {
    let recent = Utc::now().date_naive() - Duration::days(120);
    let transactions: Vec<ComparableTransaction> = (0..5)
        .map(|i| ComparableTransaction {
            address: format!("{} rue de la Folie-Méricourt", 3 + i),
            district: "75011".into(),
            sale_price: 250_000.0,
            surface: Some(50.0),
            sale_date: recent,
            property_type: Some(PropertyType::Apartment),
        })
        .collect();
    MockMarketData::new(transactions)
}

fn pipeline_with(
    market: MockMarketData,
    text_layer: &str,
) -> (Pipeline<MemoryStore, MockMarketData>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let config = PipelineConfig::default().with_concurrency(2);

    let extractor = DocumentExtractor::new(DocumentConfig::default())
        .with_text_layer(Arc::new(FixedTextLayer::new(text_layer)));

    let pipeline = Pipeline::new(config, Arc::clone(&store), Arc::new(market))
        .unwrap()
        .with_sources(fixture_sources())
        .with_fetcher(Arc::new(
            MockDocumentFetcher::new().with_document(PV_URL, b"%PDF-fixture".to_vec()),
        ))
        .with_document_extractor(extractor);

    (pipeline, store)
}

#[tokio::test]
async fn two_sources_reconcile_into_one_record() {
    let (pipeline, store) = pipeline_with(market_at_5000(), &pv_text());

    let records = pipeline.ingest_all().await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(store.record_count(), 1);

    let record = &records[0];
    // Both listing pages are remembered on the single record
    assert_eq!(record.listing_urls.len(), 2);
    // Licitor outranks encheres_publiques, so its address casing wins
    assert_eq!(record.address.as_deref(), Some("12 rue Oberkampf"));
    assert_eq!(record.department.as_deref(), Some("75"));
}

#[tokio::test]
async fn document_surface_outranks_listing_surface() {
    let (pipeline, _store) = pipeline_with(market_at_5000(), &pv_text());

    let records = pipeline.ingest_all().await.unwrap();
    let record = &records[0];

    assert_eq!(record.document_status, DocumentStatus::Extracted);
    // 45.0 and 44.0 came from listings; the PV value supersedes both
    assert_eq!(record.surface, Some(46.25));
}

#[tokio::test]
async fn ingest_then_analyze_scores_the_deal() {
    let (pipeline, store) = pipeline_with(market_at_5000(), &pv_text());

    let records = pipeline.ingest_all().await.unwrap();
    let results = pipeline.analyze(&records).await.unwrap();

    assert_eq!(results.len(), 1);
    let result = &results[0];

    // 185 000 € / 46.25 m² = 4 000 €/m² against a 5 000 €/m² market
    assert_eq!(result.discount_percent, Some(20.0));
    assert_eq!(result.tier, Tier::GoodDeal);
    assert!(result.score.is_some());

    // Computed fields are written back to the persisted record
    let stored = store.get(&records[0].key).await.unwrap().unwrap();
    assert_eq!(stored.market_price_m2, Some(5000.0));
    assert_eq!(stored.sale_price_m2, Some(4000.0));
    assert_eq!(stored.discount_percent, Some(20.0));
    assert!(stored.opportunity_score.is_some());
}

#[tokio::test]
async fn too_few_comparables_leaves_score_unavailable() {
    let recent = Utc::now().date_naive() - Duration::days(60);
    let two_sales: Vec<ComparableTransaction> = (0..2)
        .map(|i| ComparableTransaction {
            address: format!("{} avenue Parmentier", 10 + i),
            district: "75011".into(),
            sale_price: 250_000.0,
            surface: Some(50.0),
            sale_date: recent,
            property_type: Some(PropertyType::Apartment),
        })
        .collect();

    let store = Arc::new(MemoryStore::new());
    let config = PipelineConfig::default().with_min_comparables(5);
    let pipeline = Pipeline::new(
        config,
        Arc::clone(&store),
        Arc::new(MockMarketData::new(two_sales)),
    )
    .unwrap()
    .with_sources(fixture_sources());

    let mut record = AuctionRecord::new(encheres::identity_key(
        Some("12 rue Oberkampf"),
        Some("TJ Paris"),
        Some(sale_date()),
    ));
    record.postal_code = Some("75011".into());
    record.surface = Some(46.25);
    record.starting_price = Some(185_000.0);
    record.property_type = Some(PropertyType::Apartment);

    let results = pipeline.analyze(std::slice::from_ref(&record)).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].score, None);
    assert_eq!(results[0].discount_percent, None);
    assert_eq!(results[0].tier, Tier::None);
    // Nothing was written back
    assert!(store.get(&record.key).await.unwrap().is_none());
}

#[tokio::test]
async fn unreadable_document_marks_extraction_failed() {
    // 3 characters of text and no OCR backend: the fallback also fails
    let (pipeline, _store) = pipeline_with(market_at_5000(), "abc");

    let records = pipeline.ingest_all().await.unwrap();
    let record = &records[0];

    assert_eq!(record.document_status, DocumentStatus::ExtractionFailed);
    // Listing-derived fields are unaffected by the failure
    assert_eq!(record.surface, Some(45.0));
    assert_eq!(record.starting_price, Some(185_000.0));
    assert_eq!(record.address.as_deref(), Some("12 rue Oberkampf"));
}

#[tokio::test]
async fn cancelled_pipeline_stops_scheduling_work() {
    let (pipeline, store) = pipeline_with(market_at_5000(), &pv_text());

    pipeline.cancellation_token().cancel();
    let records = pipeline.ingest_all().await.unwrap();

    assert!(records.is_empty());
    assert_eq!(store.record_count(), 0);
}
