//! Offer/request matching, match synchronization, and the deal status lifecycle.
//!
//! Scores are explainable: every match carries one reason per factor with its weight and a
//! short explanation, so operators and seekers can see why a pair ranked where it did.

pub mod domain;
pub mod import;
pub mod lifecycle;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod store;
pub mod synchronizer;

#[cfg(test)]
mod tests;

pub use domain::{
    CargoType, CompanyId, DealStatus, DealStatusEntry, DealSubject, HistoryId, MatchId,
    NewDealStatusEntry, Offer, OfferId, RequestId, TransportRequest, UnknownVariant, WagonType,
};
pub use import::{CatalogImportError, CatalogImporter};
pub use lifecycle::{current_status, AppliedTransition, DealLifecycle, LifecycleError};
pub use repository::{
    DealNotifier, DealStatusChanged, MatchMetadata, MatchRecord, MatchUpsert, MatchingRepository,
    NotifyError, RepositoryError,
};
pub use router::matching_router;
pub use scoring::{
    FactorScores, FactorWeights, MatchScore, MatchingConfig, ScoreReason, ScoringConfigError,
    ScoringEngine, ScoringFactor,
};
pub use service::{
    DealHistoryView, InboxEntry, MatchResponse, MatchingService, MatchingServiceError,
    TransitionCommand,
};
pub use store::InMemoryMarketplace;
pub use synchronizer::{
    rank_candidates, BatchCancellation, MatchSynchronizer, PairFailure, RankedOffer,
    RecomputeOptions, RecomputeSummary, ScoredCandidate, DEFAULT_BATCH_CONCURRENCY,
};
