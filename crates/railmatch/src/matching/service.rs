use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::domain::{
    CompanyId, DealStatus, DealStatusEntry, DealSubject, MatchId, Offer, OfferId, RequestId,
    TransportRequest,
};
use super::lifecycle::{current_status, DealLifecycle, LifecycleError};
use super::repository::{
    DealNotifier, DealStatusChanged, MatchRecord, MatchingRepository, RepositoryError,
};
use super::scoring::{MatchingConfig, ScoringEngine};
use super::synchronizer::{
    BatchCancellation, MatchSynchronizer, RecomputeOptions, RecomputeSummary, ScoredCandidate,
};

/// Service composing the scoring engine, synchronizer, deal lifecycle, and notifier.
pub struct MatchingService<R, N> {
    repository: Arc<R>,
    notifier: Arc<N>,
    synchronizer: MatchSynchronizer<R>,
    lifecycle: DealLifecycle<R>,
}

impl<R, N> MatchingService<R, N>
where
    R: MatchingRepository + 'static,
    N: DealNotifier + 'static,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>, config: MatchingConfig) -> Self {
        let engine = Arc::new(ScoringEngine::new(config));
        let synchronizer = MatchSynchronizer::new(Arc::clone(&repository), engine);
        let lifecycle = DealLifecycle::new(Arc::clone(&repository));

        Self {
            repository,
            notifier,
            synchronizer,
            lifecycle,
        }
    }

    pub fn config(&self) -> &MatchingConfig {
        self.synchronizer.engine().config()
    }

    /// Score a request against every active offer and persist the kept candidates.
    ///
    /// When `caller` is given the request must belong to that company.
    pub fn match_request(
        &self,
        request_id: RequestId,
        caller: Option<CompanyId>,
    ) -> Result<MatchResponse, MatchingServiceError> {
        let request = self.owned_request(request_id, caller)?;
        let matches = self.synchronizer.sync_request(&request)?;
        Ok(MatchResponse {
            request_id,
            count: matches.len(),
            request_details: request,
            matches,
        })
    }

    pub async fn recompute(
        &self,
        options: &RecomputeOptions,
        cancellation: &BatchCancellation,
    ) -> Result<RecomputeSummary, MatchingServiceError> {
        let summary = self.synchronizer.recompute(options, cancellation).await?;
        Ok(summary)
    }

    /// Apply a deal status change and inform the notifier.
    pub fn transition(
        &self,
        command: TransitionCommand,
    ) -> Result<DealStatusEntry, MatchingServiceError> {
        let subject = DealSubject::from_parts(command.match_id, command.request_id)?;
        self.apply(subject, command.status, command.comment)
    }

    /// Seeker withdraws a request thread. When `caller` is given it must own the request.
    pub fn cancel_request(
        &self,
        request_id: RequestId,
        caller: Option<CompanyId>,
        comment: Option<String>,
    ) -> Result<DealStatusEntry, MatchingServiceError> {
        self.owned_request(request_id, caller)?;
        self.apply(
            DealSubject::Request(request_id),
            DealStatus::Cancelled,
            comment,
        )
    }

    fn owned_request(
        &self,
        request_id: RequestId,
        caller: Option<CompanyId>,
    ) -> Result<TransportRequest, MatchingServiceError> {
        let request = self
            .repository
            .fetch_request(request_id)?
            .ok_or(MatchingServiceError::RequestNotFound(request_id))?;
        match caller {
            Some(caller) if request.company_id != caller => {
                Err(MatchingServiceError::NotOwned { request_id, caller })
            }
            _ => Ok(request),
        }
    }

    pub fn deal_history(
        &self,
        subject: DealSubject,
    ) -> Result<DealHistoryView, MatchingServiceError> {
        let history = self.lifecycle.history(subject)?;
        Ok(DealHistoryView {
            subject,
            current_status: current_status(&history),
            history,
        })
    }

    pub fn archive_offer(&self, offer_id: OfferId) -> Result<Offer, MatchingServiceError> {
        self.set_archived(offer_id, true)
    }

    pub fn activate_offer(&self, offer_id: OfferId) -> Result<Offer, MatchingServiceError> {
        self.set_archived(offer_id, false)
    }

    /// Matches on offers owned by an operator company, newest first. Archived offers included.
    pub fn operator_responses(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<InboxEntry>, MatchingServiceError> {
        let mut owned = BTreeSet::new();
        for record in self.repository.list_matches()? {
            if owned.contains(&record.offer_id) {
                continue;
            }
            let offer = self.repository.fetch_offer(record.offer_id)?;
            if offer.is_some_and(|offer| offer.company_id == company_id) {
                owned.insert(record.offer_id);
            }
        }
        self.inbox(|record| owned.contains(&record.offer_id))
    }

    /// Matches on requests owned by a seeker company, newest first.
    pub fn seeker_inbox(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<InboxEntry>, MatchingServiceError> {
        let owned: BTreeSet<RequestId> = self
            .repository
            .list_requests(None)?
            .into_iter()
            .filter(|request| request.company_id == company_id)
            .map(|request| request.id)
            .collect();
        self.inbox(|record| owned.contains(&record.request_id))
    }

    fn apply(
        &self,
        subject: DealSubject,
        status: DealStatus,
        comment: Option<String>,
    ) -> Result<DealStatusEntry, MatchingServiceError> {
        let applied = self.lifecycle.transition(subject, status, comment)?;
        let notice = DealStatusChanged {
            subject,
            previous: applied.previous,
            current: applied.entry.status,
            history_id: applied.entry.id,
            comment: applied.entry.comment.clone(),
        };
        if let Err(error) = self.notifier.notify(notice) {
            tracing::warn!(%subject, error = %error, "deal notification failed");
        }
        Ok(applied.entry)
    }

    fn set_archived(&self, offer_id: OfferId, archived: bool) -> Result<Offer, MatchingServiceError> {
        match self.repository.set_offer_archived(offer_id, archived) {
            Ok(offer) => {
                tracing::info!(offer_id = %offer_id, archived, "offer visibility changed");
                Ok(offer)
            }
            Err(RepositoryError::NotFound) => Err(MatchingServiceError::OfferNotFound(offer_id)),
            Err(other) => Err(other.into()),
        }
    }

    fn inbox<F>(&self, owned: F) -> Result<Vec<InboxEntry>, MatchingServiceError>
    where
        F: Fn(&MatchRecord) -> bool,
    {
        let mut entries = Vec::new();
        for record in self.repository.list_matches()? {
            if !owned(&record) {
                continue;
            }
            let history = self.lifecycle.history(DealSubject::Match(record.id))?;
            entries.push(InboxEntry {
                match_id: record.id,
                offer_id: record.offer_id,
                request_id: record.request_id,
                score: record.external_score(),
                current_status: current_status(&history),
                latest: history.into_iter().next(),
                created_at: record.created_at,
            });
        }
        entries.sort_by(|left, right| {
            (right.created_at, right.match_id).cmp(&(left.created_at, left.match_id))
        });
        Ok(entries)
    }
}

/// Parse a numeric identifier received as text, naming the field on failure.
pub fn parse_identifier(field: &'static str, raw: &str) -> Result<u64, MatchingServiceError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| MatchingServiceError::InvalidIdentifier {
            field,
            value: raw.to_string(),
        })
}

/// Body of a deal status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionCommand {
    #[serde(default)]
    pub match_id: Option<MatchId>,
    #[serde(default)]
    pub request_id: Option<RequestId>,
    pub status: DealStatus,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResponse {
    pub request_id: RequestId,
    pub request_details: TransportRequest,
    pub matches: Vec<ScoredCandidate>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealHistoryView {
    pub subject: DealSubject,
    pub current_status: DealStatus,
    pub history: Vec<DealStatusEntry>,
}

/// One match as seen from a party's inbox.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxEntry {
    pub match_id: MatchId,
    pub offer_id: OfferId,
    pub request_id: RequestId,
    pub score: u8,
    pub current_status: DealStatus,
    pub latest: Option<DealStatusEntry>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Error raised by the matching service.
#[derive(Debug, thiserror::Error)]
pub enum MatchingServiceError {
    #[error("request {0} not found")]
    RequestNotFound(RequestId),
    #[error("offer {0} not found")]
    OfferNotFound(OfferId),
    #[error("request {request_id} does not belong to company {caller}")]
    NotOwned {
        request_id: RequestId,
        caller: CompanyId,
    },
    #[error("invalid {field} '{value}'")]
    InvalidIdentifier { field: &'static str, value: String },
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
