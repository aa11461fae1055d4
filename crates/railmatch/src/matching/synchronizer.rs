use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::task::{JoinError, JoinSet};

use super::domain::{MatchId, Offer, OfferId, RequestId, TransportRequest};
use super::repository::{MatchMetadata, MatchUpsert, MatchingRepository, RepositoryError};
use super::scoring::{MatchScore, ScoringEngine};

pub const DEFAULT_BATCH_CONCURRENCY: usize = 4;

/// An offer scored against a request, before persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedOffer {
    pub offer: Offer,
    pub score: MatchScore,
}

/// A ranked offer together with the match row it was written to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredCandidate {
    pub match_id: MatchId,
    pub offer_id: OfferId,
    pub offer: Offer,
    #[serde(flatten)]
    pub score: MatchScore,
}

/// Score every offer against `request`, keep those at or above the threshold, best first.
///
/// The sort is stable, so offers with equal scores keep their input order.
pub fn rank_candidates(
    engine: &ScoringEngine,
    request: &TransportRequest,
    offers: &[Offer],
) -> Vec<RankedOffer> {
    let threshold = engine.config().min_external_score();
    let mut ranked: Vec<RankedOffer> = offers
        .iter()
        .map(|offer| RankedOffer {
            offer: offer.clone(),
            score: engine.score(offer, request),
        })
        .filter(|candidate| f64::from(candidate.score.score) >= threshold)
        .collect();
    ranked.sort_by(|left, right| right.score.score.cmp(&left.score.score));
    ranked
}

/// Keeps persisted matches in step with the current offers, requests, and scoring config.
pub struct MatchSynchronizer<R> {
    repository: Arc<R>,
    engine: Arc<ScoringEngine>,
}

impl<R> MatchSynchronizer<R>
where
    R: MatchingRepository + 'static,
{
    pub fn new(repository: Arc<R>, engine: Arc<ScoringEngine>) -> Self {
        Self { repository, engine }
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    /// Rank non-archived offers for one request and upsert a match for each kept candidate.
    pub fn sync_request(
        &self,
        request: &TransportRequest,
    ) -> Result<Vec<ScoredCandidate>, RepositoryError> {
        let offers = self.repository.active_offers()?;
        let ranked = rank_candidates(&self.engine, request, &offers);
        let computed_at = Utc::now();

        let mut candidates = Vec::with_capacity(ranked.len());
        for RankedOffer { offer, score } in ranked {
            let record = self.repository.upsert_match(MatchUpsert {
                offer_id: offer.id,
                request_id: request.id,
                score: score.fraction(),
                metadata: MatchMetadata::from_score(&score, computed_at),
            })?;
            tracing::debug!(
                request_id = %request.id,
                offer_id = %offer.id,
                match_id = %record.id,
                score = score.score,
                "match stored"
            );
            candidates.push(ScoredCandidate {
                match_id: record.id,
                offer_id: offer.id,
                offer,
                score,
            });
        }

        tracing::info!(
            request_id = %request.id,
            offers = offers.len(),
            candidates = candidates.len(),
            "request synchronized"
        );
        Ok(candidates)
    }

    /// Score and upsert every (request, offer) pair in scope.
    ///
    /// At most `options.concurrency` pairs are in flight. Finished pairs are recorded as soon
    /// as a slot is needed, so the summary keeps pace with dispatch. Failed pairs are collected
    /// and never stop the batch. `cancellation` is checked before each pair is dispatched;
    /// pairs already running are allowed to finish. Only failing to load the catalog itself is
    /// returned as an error.
    pub async fn recompute(
        &self,
        options: &RecomputeOptions,
        cancellation: &BatchCancellation,
    ) -> Result<RecomputeSummary, RepositoryError> {
        let requests = self
            .repository
            .list_requests(options.request_ids.as_deref())?;
        let offers = self.repository.active_offers()?;
        let threshold = self.engine.config().min_external_score();
        let width = options.concurrency.max(1);

        tracing::info!(
            requests = requests.len(),
            offers = offers.len(),
            concurrency = width,
            "match recomputation started"
        );

        let mut workers = JoinSet::new();
        let mut summary = RecomputeSummary::default();

        'requests: for request in requests {
            let request = Arc::new(request);
            for offer in &offers {
                while workers.len() >= width {
                    match workers.join_next().await {
                        Some(joined) => summary.record(joined),
                        None => break,
                    }
                }
                if cancellation.is_cancelled() {
                    summary.cancelled = true;
                    break 'requests;
                }

                let repository = Arc::clone(&self.repository);
                let engine = Arc::clone(&self.engine);
                let request = Arc::clone(&request);
                let offer = offer.clone();
                workers.spawn_blocking(move || {
                    score_pair(repository.as_ref(), &engine, &offer, &request, threshold)
                });
            }
            summary.requests_processed += 1;
        }

        while let Some(joined) = workers.join_next().await {
            summary.record(joined);
        }

        if summary.cancelled {
            tracing::warn!(
                requests_processed = summary.requests_processed,
                pairs_scored = summary.pairs_scored,
                "match recomputation cancelled"
            );
        }
        tracing::info!(
            requests_processed = summary.requests_processed,
            pairs_scored = summary.pairs_scored,
            matches_written = summary.matches_written,
            above_threshold = summary.above_threshold,
            failures = summary.failures.len(),
            "match recomputation finished"
        );
        Ok(summary)
    }
}

fn score_pair<R>(
    repository: &R,
    engine: &ScoringEngine,
    offer: &Offer,
    request: &TransportRequest,
    threshold: f64,
) -> PairOutcome
where
    R: MatchingRepository + ?Sized,
{
    let score = engine.score(offer, request);
    tracing::debug!(
        request_id = %request.id,
        offer_id = %offer.id,
        score = score.score,
        "pair scored"
    );

    let stored = repository.upsert_match(MatchUpsert {
        offer_id: offer.id,
        request_id: request.id,
        score: score.fraction(),
        metadata: MatchMetadata::from_score(&score, Utc::now()),
    });

    PairOutcome {
        offer_id: offer.id,
        request_id: request.id,
        above_threshold: f64::from(score.score) >= threshold,
        stored: stored.map(|_| ()),
    }
}

struct PairOutcome {
    offer_id: OfferId,
    request_id: RequestId,
    above_threshold: bool,
    stored: Result<(), RepositoryError>,
}

/// Scope and sizing for a batch recomputation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecomputeOptions {
    /// Restrict the batch to these requests; `None` means all requests.
    pub request_ids: Option<Vec<RequestId>>,
    pub concurrency: usize,
}

impl Default for RecomputeOptions {
    fn default() -> Self {
        Self {
            request_ids: None,
            concurrency: DEFAULT_BATCH_CONCURRENCY,
        }
    }
}

/// Cooperative stop flag shared between a running batch and whoever may cancel it.
#[derive(Debug, Clone, Default)]
pub struct BatchCancellation(Arc<AtomicBool>);

impl BatchCancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A pair whose score could not be persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairFailure {
    pub offer_id: Option<OfferId>,
    pub request_id: Option<RequestId>,
    pub error: String,
}

/// Counts reported at the end of a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeSummary {
    pub requests_processed: usize,
    pub pairs_scored: usize,
    pub matches_written: usize,
    pub above_threshold: usize,
    pub failures: Vec<PairFailure>,
    pub cancelled: bool,
}

impl RecomputeSummary {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }

    fn record(&mut self, joined: Result<PairOutcome, JoinError>) {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::warn!(error = %error, "pair worker aborted");
                self.failures.push(PairFailure {
                    offer_id: None,
                    request_id: None,
                    error: error.to_string(),
                });
                return;
            }
        };

        self.pairs_scored += 1;
        if outcome.above_threshold {
            self.above_threshold += 1;
        }
        match outcome.stored {
            Ok(()) => self.matches_written += 1,
            Err(error) => {
                tracing::warn!(
                    offer_id = %outcome.offer_id,
                    request_id = %outcome.request_id,
                    error = %error,
                    "failed to store match"
                );
                self.failures.push(PairFailure {
                    offer_id: Some(outcome.offer_id),
                    request_id: Some(outcome.request_id),
                    error: error.to_string(),
                });
            }
        }
    }
}
