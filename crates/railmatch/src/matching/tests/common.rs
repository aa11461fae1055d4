use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::matching::domain::{
    CargoType, CompanyId, DealStatusEntry, DealSubject, MatchId, NewDealStatusEntry, Offer,
    OfferId, RequestId, TransportRequest, WagonType,
};
use crate::matching::repository::{
    DealNotifier, DealStatusChanged, MatchRecord, MatchUpsert, MatchingRepository, NotifyError,
    RepositoryError,
};
use crate::matching::scoring::MatchingConfig;
use crate::matching::store::InMemoryMarketplace;
use crate::matching::synchronizer::BatchCancellation;
use crate::matching::{matching_router, MatchingService};

pub(super) const OPERATOR: CompanyId = CompanyId(10);
pub(super) const OTHER_OPERATOR: CompanyId = CompanyId(11);
pub(super) const SEEKER: CompanyId = CompanyId(20);

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// PLATFORM wagons for metal, Свердловская to Московская, 2024-11-25..2024-12-25 at 52 000.
pub(super) fn reference_offer() -> Offer {
    Offer {
        id: OfferId(1),
        company_id: OPERATOR,
        wagon_type: WagonType::Platform,
        cargo_type: CargoType::Metal,
        wagon_count: 12,
        departure_station: "Екатеринбург-Сортировочный".to_string(),
        departure_region: "Свердловская область".to_string(),
        arrival_station: "Москва-Товарная".to_string(),
        arrival_region: "Московская область".to_string(),
        available_from: date(2024, 11, 25),
        available_until: date(2024, 12, 25),
        price_per_wagon: 52_000.0,
        description: Some("Платформы под металлопрокат".to_string()),
        is_archived: false,
    }
}

/// Metal on PLATFORM wagons, same route, 2024-12-01..2024-12-15, budget 55 000.
pub(super) fn reference_request() -> TransportRequest {
    TransportRequest {
        id: RequestId(100),
        company_id: SEEKER,
        cargo_type: CargoType::Metal,
        wagon_type: Some(WagonType::Platform),
        cargo_weight: 640.0,
        departure_station: "Екатеринбург-Сортировочный".to_string(),
        departure_region: "Свердловская область".to_string(),
        arrival_station: "Москва-Товарная".to_string(),
        arrival_region: "Московская область".to_string(),
        loading_date: date(2024, 12, 1),
        required_by_date: date(2024, 12, 15),
        max_price_per_wagon: Some(55_000.0),
        description: None,
    }
}

/// Tank wagons on an unrelated route; scores far below the threshold for metal.
pub(super) fn unsuitable_offer() -> Offer {
    Offer {
        id: OfferId(2),
        company_id: OTHER_OPERATOR,
        wagon_type: WagonType::Tank,
        cargo_type: CargoType::Oil,
        wagon_count: 30,
        departure_station: "Самара".to_string(),
        departure_region: "Самарская область".to_string(),
        arrival_station: "Санкт-Петербург".to_string(),
        arrival_region: "Ленинградская область".to_string(),
        available_from: date(2025, 3, 1),
        available_until: date(2025, 3, 31),
        price_per_wagon: 90_000.0,
        description: None,
        is_archived: false,
    }
}

/// Flatcars leaving a neighbouring region, a little over budget.
pub(super) fn runner_up_offer() -> Offer {
    Offer {
        id: OfferId(3),
        company_id: OTHER_OPERATOR,
        wagon_type: WagonType::Flatcar,
        cargo_type: CargoType::Metal,
        wagon_count: 8,
        departure_station: "Пермь".to_string(),
        departure_region: "Пермский край".to_string(),
        arrival_station: "Москва-Товарная".to_string(),
        arrival_region: "Московская область".to_string(),
        available_from: date(2024, 11, 28),
        available_until: date(2024, 12, 20),
        price_per_wagon: 57_000.0,
        description: None,
        is_archived: false,
    }
}

pub(super) fn catalog() -> (Vec<Offer>, Vec<TransportRequest>) {
    let mut second_request = reference_request();
    second_request.id = RequestId(101);
    second_request.wagon_type = None;
    second_request.max_price_per_wagon = None;

    (
        vec![reference_offer(), unsuitable_offer(), runner_up_offer()],
        vec![reference_request(), second_request],
    )
}

pub(super) fn marketplace() -> Arc<InMemoryMarketplace> {
    let (offers, requests) = catalog();
    Arc::new(InMemoryMarketplace::with_catalog(offers, requests))
}

pub(super) fn build_service() -> (
    MatchingService<InMemoryMarketplace, MemoryNotifier>,
    Arc<InMemoryMarketplace>,
    Arc<MemoryNotifier>,
) {
    let repository = marketplace();
    let notifier = Arc::new(MemoryNotifier::default());
    let service = MatchingService::new(
        repository.clone(),
        notifier.clone(),
        MatchingConfig::default(),
    );
    (service, repository, notifier)
}

pub(super) fn matching_router_with_service(
    service: MatchingService<InMemoryMarketplace, MemoryNotifier>,
) -> axum::Router {
    matching_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[derive(Default)]
pub(super) struct MemoryNotifier {
    notices: Mutex<Vec<DealStatusChanged>>,
}

impl MemoryNotifier {
    pub(super) fn notices(&self) -> Vec<DealStatusChanged> {
        self.notices.lock().expect("notifier mutex poisoned").clone()
    }
}

impl DealNotifier for MemoryNotifier {
    fn notify(&self, notice: DealStatusChanged) -> Result<(), NotifyError> {
        self.notices
            .lock()
            .expect("notifier mutex poisoned")
            .push(notice);
        Ok(())
    }
}

pub(super) struct FailingNotifier;

impl DealNotifier for FailingNotifier {
    fn notify(&self, _notice: DealStatusChanged) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("broker offline".to_string()))
    }
}

/// Delegates to an in-memory store but refuses to persist matches for one offer.
///
/// When `cancel_on_failure` is set, the first refused write also cancels that batch.
pub(super) struct FlakyRepository {
    pub(super) inner: InMemoryMarketplace,
    pub(super) failing_offer: OfferId,
    pub(super) cancel_on_failure: Option<BatchCancellation>,
}

impl MatchingRepository for FlakyRepository {
    fn fetch_offer(&self, id: OfferId) -> Result<Option<Offer>, RepositoryError> {
        self.inner.fetch_offer(id)
    }

    fn active_offers(&self) -> Result<Vec<Offer>, RepositoryError> {
        self.inner.active_offers()
    }

    fn set_offer_archived(&self, id: OfferId, archived: bool) -> Result<Offer, RepositoryError> {
        self.inner.set_offer_archived(id, archived)
    }

    fn fetch_request(&self, id: RequestId) -> Result<Option<TransportRequest>, RepositoryError> {
        self.inner.fetch_request(id)
    }

    fn list_requests(
        &self,
        ids: Option<&[RequestId]>,
    ) -> Result<Vec<TransportRequest>, RepositoryError> {
        self.inner.list_requests(ids)
    }

    fn upsert_match(&self, upsert: MatchUpsert) -> Result<MatchRecord, RepositoryError> {
        if upsert.offer_id == self.failing_offer {
            if let Some(cancellation) = &self.cancel_on_failure {
                cancellation.cancel();
            }
            return Err(RepositoryError::Unavailable("write timeout".to_string()));
        }
        self.inner.upsert_match(upsert)
    }

    fn fetch_match(&self, id: MatchId) -> Result<Option<MatchRecord>, RepositoryError> {
        self.inner.fetch_match(id)
    }

    fn list_matches(&self) -> Result<Vec<MatchRecord>, RepositoryError> {
        self.inner.list_matches()
    }

    fn append_history(
        &self,
        entry: NewDealStatusEntry,
    ) -> Result<DealStatusEntry, RepositoryError> {
        self.inner.append_history(entry)
    }

    fn history_for(&self, subject: DealSubject) -> Result<Vec<DealStatusEntry>, RepositoryError> {
        self.inner.history_for(subject)
    }
}

pub(super) struct UnavailableRepository;

impl MatchingRepository for UnavailableRepository {
    fn fetch_offer(&self, _id: OfferId) -> Result<Option<Offer>, RepositoryError> {
        Err(unavailable())
    }

    fn active_offers(&self) -> Result<Vec<Offer>, RepositoryError> {
        Err(unavailable())
    }

    fn set_offer_archived(&self, _id: OfferId, _archived: bool) -> Result<Offer, RepositoryError> {
        Err(unavailable())
    }

    fn fetch_request(&self, _id: RequestId) -> Result<Option<TransportRequest>, RepositoryError> {
        Err(unavailable())
    }

    fn list_requests(
        &self,
        _ids: Option<&[RequestId]>,
    ) -> Result<Vec<TransportRequest>, RepositoryError> {
        Err(unavailable())
    }

    fn upsert_match(&self, _upsert: MatchUpsert) -> Result<MatchRecord, RepositoryError> {
        Err(unavailable())
    }

    fn fetch_match(&self, _id: MatchId) -> Result<Option<MatchRecord>, RepositoryError> {
        Err(unavailable())
    }

    fn list_matches(&self) -> Result<Vec<MatchRecord>, RepositoryError> {
        Err(unavailable())
    }

    fn append_history(
        &self,
        _entry: NewDealStatusEntry,
    ) -> Result<DealStatusEntry, RepositoryError> {
        Err(unavailable())
    }

    fn history_for(&self, _subject: DealSubject) -> Result<Vec<DealStatusEntry>, RepositoryError> {
        Err(unavailable())
    }
}

fn unavailable() -> RepositoryError {
    RepositoryError::Unavailable("database offline".to_string())
}
