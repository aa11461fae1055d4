use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use super::domain::{
    DealStatusEntry, DealSubject, HistoryId, MatchId, NewDealStatusEntry, Offer, OfferId,
    RequestId, TransportRequest,
};
use super::repository::{MatchRecord, MatchUpsert, MatchingRepository, RepositoryError};

#[derive(Debug, Default)]
struct Tables {
    offers: BTreeMap<OfferId, Offer>,
    requests: BTreeMap<RequestId, TransportRequest>,
    matches: BTreeMap<MatchId, MatchRecord>,
    match_index: HashMap<(OfferId, RequestId), MatchId>,
    history: Vec<DealStatusEntry>,
    next_match_id: u64,
    next_history_id: u64,
}

/// Process-local store used by the CLI, the HTTP service, and tests.
///
/// Matches carry a unique (offer, request) index; history is an append-only vector whose
/// timestamps never go backwards, so "latest entry" is well defined even on clock skew.
#[derive(Debug, Default, Clone)]
pub struct InMemoryMarketplace {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryMarketplace {
    pub fn with_catalog(offers: Vec<Offer>, requests: Vec<TransportRequest>) -> Self {
        let store = Self::default();
        {
            let mut tables = store.lock();
            tables.offers = offers.into_iter().map(|offer| (offer.id, offer)).collect();
            tables.requests = requests
                .into_iter()
                .map(|request| (request.id, request))
                .collect();
        }
        store
    }

    pub fn insert_offer(&self, offer: Offer) -> Result<(), RepositoryError> {
        let mut tables = self.lock();
        if tables.offers.contains_key(&offer.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.offers.insert(offer.id, offer);
        Ok(())
    }

    pub fn insert_request(&self, request: TransportRequest) -> Result<(), RepositoryError> {
        let mut tables = self.lock();
        if tables.requests.contains_key(&request.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.requests.insert(request.id, request);
        Ok(())
    }

    pub fn match_count(&self) -> usize {
        self.lock().matches.len()
    }

    pub fn history_len(&self) -> usize {
        self.lock().history.len()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MatchingRepository for InMemoryMarketplace {
    fn fetch_offer(&self, id: OfferId) -> Result<Option<Offer>, RepositoryError> {
        Ok(self.lock().offers.get(&id).cloned())
    }

    fn active_offers(&self) -> Result<Vec<Offer>, RepositoryError> {
        Ok(self
            .lock()
            .offers
            .values()
            .filter(|offer| !offer.is_archived)
            .cloned()
            .collect())
    }

    fn set_offer_archived(&self, id: OfferId, archived: bool) -> Result<Offer, RepositoryError> {
        let mut tables = self.lock();
        let offer = tables.offers.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        offer.is_archived = archived;
        Ok(offer.clone())
    }

    fn fetch_request(&self, id: RequestId) -> Result<Option<TransportRequest>, RepositoryError> {
        Ok(self.lock().requests.get(&id).cloned())
    }

    fn list_requests(
        &self,
        ids: Option<&[RequestId]>,
    ) -> Result<Vec<TransportRequest>, RepositoryError> {
        let tables = self.lock();
        let requests = match ids {
            Some(ids) => tables
                .requests
                .values()
                .filter(|request| ids.contains(&request.id))
                .cloned()
                .collect(),
            None => tables.requests.values().cloned().collect(),
        };
        Ok(requests)
    }

    fn upsert_match(&self, upsert: MatchUpsert) -> Result<MatchRecord, RepositoryError> {
        let mut tables = self.lock();
        let now = Utc::now();
        let key = (upsert.offer_id, upsert.request_id);

        if let Some(id) = tables.match_index.get(&key).copied() {
            let record = tables.matches.get_mut(&id).ok_or(RepositoryError::NotFound)?;
            record.score = upsert.score;
            record.metadata = upsert.metadata;
            record.updated_at = now;
            return Ok(record.clone());
        }

        tables.next_match_id += 1;
        let id = MatchId(tables.next_match_id);
        let record = MatchRecord {
            id,
            offer_id: upsert.offer_id,
            request_id: upsert.request_id,
            score: upsert.score,
            metadata: upsert.metadata,
            created_at: now,
            updated_at: now,
        };
        tables.match_index.insert(key, id);
        tables.matches.insert(id, record.clone());
        Ok(record)
    }

    fn fetch_match(&self, id: MatchId) -> Result<Option<MatchRecord>, RepositoryError> {
        Ok(self.lock().matches.get(&id).cloned())
    }

    fn list_matches(&self) -> Result<Vec<MatchRecord>, RepositoryError> {
        Ok(self.lock().matches.values().cloned().collect())
    }

    fn append_history(
        &self,
        entry: NewDealStatusEntry,
    ) -> Result<DealStatusEntry, RepositoryError> {
        let mut tables = self.lock();
        let now = Utc::now();
        let created_at = tables
            .history
            .last()
            .map_or(now, |last| last.created_at.max(now));

        tables.next_history_id += 1;
        let stored = DealStatusEntry {
            id: HistoryId(tables.next_history_id),
            subject: entry.subject,
            status: entry.status,
            comment: entry.comment,
            created_at,
        };
        tables.history.push(stored.clone());
        Ok(stored)
    }

    fn history_for(&self, subject: DealSubject) -> Result<Vec<DealStatusEntry>, RepositoryError> {
        Ok(self
            .lock()
            .history
            .iter()
            .filter(|entry| entry.subject == subject)
            .cloned()
            .collect())
    }
}
