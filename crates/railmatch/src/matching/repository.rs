use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    DealStatus, DealStatusEntry, DealSubject, HistoryId, MatchId, NewDealStatusEntry, Offer,
    OfferId, RequestId, TransportRequest,
};
use super::scoring::{FactorScores, MatchScore, ScoreReason};

/// Metadata persisted with every match: the explained breakdown and when it was computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchMetadata {
    pub reasons: Vec<ScoreReason>,
    pub metadata: FactorScores,
    pub computed_at: DateTime<Utc>,
}

impl MatchMetadata {
    pub fn from_score(score: &MatchScore, computed_at: DateTime<Utc>) -> Self {
        Self {
            reasons: score.reasons.clone(),
            metadata: score.metadata,
            computed_at,
        }
    }
}

/// Stored association between one offer and one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub id: MatchId,
    pub offer_id: OfferId,
    pub request_id: RequestId,
    /// Internal 0-1 scale.
    pub score: f64,
    pub metadata: MatchMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MatchRecord {
    /// Score on the 0-100 scale shown to users.
    pub fn external_score(&self) -> u8 {
        (self.score * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

/// Create-or-update payload keyed by (offer, request).
#[derive(Debug, Clone, PartialEq)]
pub struct MatchUpsert {
    pub offer_id: OfferId,
    pub request_id: RequestId,
    pub score: f64,
    pub metadata: MatchMetadata,
}

/// Storage abstraction over offers, requests, matches, and the deal status log.
///
/// `upsert_match` must keep at most one match per (offer, request) pair and must never touch a
/// match's creation timestamp or its history. `append_history` must assign strictly increasing
/// identifiers and never rewrite earlier entries.
pub trait MatchingRepository: Send + Sync {
    fn fetch_offer(&self, id: OfferId) -> Result<Option<Offer>, RepositoryError>;
    /// Offers that are not archived, in id order.
    fn active_offers(&self) -> Result<Vec<Offer>, RepositoryError>;
    fn set_offer_archived(&self, id: OfferId, archived: bool) -> Result<Offer, RepositoryError>;

    fn fetch_request(&self, id: RequestId) -> Result<Option<TransportRequest>, RepositoryError>;
    /// All requests, or only the listed ones, in id order.
    fn list_requests(
        &self,
        ids: Option<&[RequestId]>,
    ) -> Result<Vec<TransportRequest>, RepositoryError>;

    fn upsert_match(&self, upsert: MatchUpsert) -> Result<MatchRecord, RepositoryError>;
    fn fetch_match(&self, id: MatchId) -> Result<Option<MatchRecord>, RepositoryError>;
    fn list_matches(&self) -> Result<Vec<MatchRecord>, RepositoryError>;

    fn append_history(&self, entry: NewDealStatusEntry)
        -> Result<DealStatusEntry, RepositoryError>;
    /// Entries for a subject in insertion order.
    fn history_for(&self, subject: DealSubject) -> Result<Vec<DealStatusEntry>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook informing the messaging subsystem about accepted transitions.
pub trait DealNotifier: Send + Sync {
    fn notify(&self, notice: DealStatusChanged) -> Result<(), NotifyError>;
}

/// Payload sent to [`DealNotifier`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealStatusChanged {
    pub subject: DealSubject,
    pub previous: DealStatus,
    pub current: DealStatus,
    pub history_id: HistoryId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
