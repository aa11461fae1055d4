use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::domain::{
    DealStatus, DealStatusEntry, DealSubject, MatchId, NewDealStatusEntry, RequestId,
};
use super::repository::{MatchingRepository, RepositoryError};

impl DealStatus {
    /// Statuses reachable from `self` in a single step.
    pub const fn allowed_transitions(self) -> &'static [DealStatus] {
        match self {
            DealStatus::Pending => &[
                DealStatus::Negotiating,
                DealStatus::Accepted,
                DealStatus::Rejected,
            ],
            DealStatus::Negotiating => &[
                DealStatus::Accepted,
                DealStatus::Rejected,
                DealStatus::Completed,
                DealStatus::Cancelled,
            ],
            DealStatus::Accepted => &[DealStatus::Completed, DealStatus::Cancelled],
            DealStatus::Rejected | DealStatus::Completed | DealStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, next: DealStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub const fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

impl DealSubject {
    /// Resolve the subject of a transition command; exactly one identifier must be present.
    pub fn from_parts(
        match_id: Option<MatchId>,
        request_id: Option<RequestId>,
    ) -> Result<Self, LifecycleError> {
        match (match_id, request_id) {
            (Some(id), None) => Ok(DealSubject::Match(id)),
            (None, Some(id)) => Ok(DealSubject::Request(id)),
            (None, None) => Err(LifecycleError::MissingSubject),
            (Some(_), Some(_)) => Err(LifecycleError::AmbiguousSubject),
        }
    }
}

/// Status implied by a history: the entry with the greatest (created_at, id), or PENDING.
pub fn current_status(history: &[DealStatusEntry]) -> DealStatus {
    history
        .iter()
        .max_by_key(|entry| (entry.created_at, entry.id))
        .map_or(DealStatus::Pending, |entry| entry.status)
}

/// Deal state machine over the append-only status log.
///
/// Transitions on the same subject run one at a time so that two callers cannot both validate
/// against the same current status. Transitions on different subjects proceed independently.
/// A subject's gate lives only while a transition on it is in flight.
pub struct DealLifecycle<R> {
    repository: Arc<R>,
    locks: Mutex<HashMap<DealSubject, Arc<Mutex<()>>>>,
}

/// Outcome of an accepted transition.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedTransition {
    pub previous: DealStatus,
    pub entry: DealStatusEntry,
}

impl<R> DealLifecycle<R>
where
    R: MatchingRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self {
            repository,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Validate and record a move of `subject` to `next`.
    ///
    /// Nothing is written when the subject is unknown or the move is not in the table.
    pub fn transition(
        &self,
        subject: DealSubject,
        next: DealStatus,
        comment: Option<String>,
    ) -> Result<AppliedTransition, LifecycleError> {
        self.ensure_exists(subject)?;

        let gate = self.gate(subject);
        let outcome = {
            let _serialized = gate.lock().unwrap_or_else(PoisonError::into_inner);
            self.append_checked(subject, next, comment)
        };
        self.release(subject, gate);
        outcome
    }

    fn append_checked(
        &self,
        subject: DealSubject,
        next: DealStatus,
        comment: Option<String>,
    ) -> Result<AppliedTransition, LifecycleError> {
        let history = self.repository.history_for(subject)?;
        let previous = current_status(&history);
        if !previous.can_transition_to(next) {
            tracing::debug!(%subject, current = %previous, requested = %next, "transition rejected");
            return Err(LifecycleError::IllegalTransition {
                current: previous,
                requested: next,
            });
        }

        let comment = comment
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        let entry = self.repository.append_history(NewDealStatusEntry {
            subject,
            status: next,
            comment,
        })?;

        tracing::info!(%subject, from = %previous, to = %next, history_id = %entry.id, "deal status changed");
        Ok(AppliedTransition { previous, entry })
    }

    pub fn current_status(&self, subject: DealSubject) -> Result<DealStatus, LifecycleError> {
        let history = self.repository.history_for(subject)?;
        Ok(current_status(&history))
    }

    /// History for a subject, newest first.
    pub fn history(&self, subject: DealSubject) -> Result<Vec<DealStatusEntry>, LifecycleError> {
        let mut history = self.repository.history_for(subject)?;
        history.sort_by(|left, right| {
            (right.created_at, right.id).cmp(&(left.created_at, left.id))
        });
        Ok(history)
    }

    fn ensure_exists(&self, subject: DealSubject) -> Result<(), LifecycleError> {
        let exists = match subject {
            DealSubject::Match(id) => self.repository.fetch_match(id)?.is_some(),
            DealSubject::Request(id) => self.repository.fetch_request(id)?.is_some(),
        };
        if exists {
            Ok(())
        } else {
            Err(LifecycleError::SubjectNotFound(subject))
        }
    }

    fn gate(&self, subject: DealSubject) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(subject).or_default())
    }

    /// Drop a gate handle and forget the subject once nobody else holds it.
    ///
    /// Handles are only cloned or dropped under the map lock, so the last releaser sees a count
    /// of one.
    fn release(&self, subject: DealSubject, gate: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        drop(gate);
        if locks
            .get(&subject)
            .is_some_and(|held| Arc::strong_count(held) == 1)
        {
            locks.remove(&subject);
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked_subjects(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Error raised by the deal state machine.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("cannot move deal from {current} to {requested}")]
    IllegalTransition {
        current: DealStatus,
        requested: DealStatus,
    },
    #[error("either matchId or requestId is required")]
    MissingSubject,
    #[error("only one of matchId or requestId may be given")]
    AmbiguousSubject,
    #[error("{0} does not exist")]
    SubjectNotFound(DealSubject),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
