use std::path::PathBuf;
use std::sync::Arc;

use railmatch::matching::{
    BatchCancellation, CatalogImportError, CatalogImporter, DealNotifier, DealStatusChanged,
    InMemoryMarketplace, MatchingConfig, MatchingService, NotifyError, OfferId, RecomputeOptions,
    RequestId,
};

struct SilentNotifier;

impl DealNotifier for SilentNotifier {
    fn notify(&self, _notice: DealStatusChanged) -> Result<(), NotifyError> {
        Ok(())
    }
}

fn sample(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../data")
        .join(name)
}

fn service_from_samples() -> MatchingService<InMemoryMarketplace, SilentNotifier> {
    let offers = CatalogImporter::offers_from_path(sample("offers.csv")).expect("offers import");
    let requests =
        CatalogImporter::requests_from_path(sample("requests.csv")).expect("requests import");
    MatchingService::new(
        Arc::new(InMemoryMarketplace::with_catalog(offers, requests)),
        Arc::new(SilentNotifier),
        MatchingConfig::default(),
    )
}

#[test]
fn sample_catalog_imports_cleanly() {
    let offers = CatalogImporter::offers_from_path(sample("offers.csv")).expect("offers import");
    let requests =
        CatalogImporter::requests_from_path(sample("requests.csv")).expect("requests import");

    assert_eq!(offers.len(), 5);
    assert_eq!(requests.len(), 3);
    assert!(offers
        .iter()
        .find(|offer| offer.id == OfferId(5))
        .expect("hopper offer present")
        .is_archived);
    let coal = requests
        .iter()
        .find(|request| request.id == RequestId(101))
        .expect("coal request present");
    assert!(coal.wagon_type.is_none());
    assert_eq!(coal.max_price_per_wagon, Some(40_000.0));
}

#[test]
fn missing_file_reports_io_error() {
    let result = CatalogImporter::offers_from_path(sample("does-not-exist.csv"));
    assert!(matches!(result, Err(CatalogImportError::Io(_))));
}

#[test]
fn coal_request_prefers_matching_gondolas() {
    let service = service_from_samples();

    let response = service
        .match_request(RequestId(101), None)
        .expect("matching succeeds");

    assert_eq!(response.matches[0].offer_id, OfferId(4));
    assert!(response.matches[0].score.score >= 90);
}

#[test]
fn activating_an_archived_offer_makes_it_eligible() {
    let service = service_from_samples();

    let before = service
        .match_request(RequestId(102), None)
        .expect("matching succeeds");
    assert!(before
        .matches
        .iter()
        .all(|candidate| candidate.offer_id != OfferId(5)));

    service.activate_offer(OfferId(5)).expect("offer activated");
    let after = service
        .match_request(RequestId(102), None)
        .expect("matching succeeds");

    assert_eq!(after.matches[0].offer_id, OfferId(5));
    assert!(after.matches[0].score.score >= 90);
}

#[tokio::test]
async fn batch_recompute_covers_active_offers_only() {
    let service = service_from_samples();

    let summary = service
        .recompute(&RecomputeOptions::default(), &BatchCancellation::new())
        .await
        .expect("batch runs");

    assert_eq!(summary.requests_processed, 3);
    assert_eq!(summary.pairs_scored, 12);
    assert_eq!(summary.matches_written, 12);
    assert!(summary.failures.is_empty());
}
