use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{CompanyId, DealSubject, MatchId, OfferId, RequestId};
use super::lifecycle::LifecycleError;
use super::repository::{DealNotifier, MatchingRepository, RepositoryError};
use super::service::{parse_identifier, MatchingService, MatchingServiceError, TransitionCommand};

pub const COMPANY_HEADER: &str = "x-company-id";

/// Router builder exposing matching, deal lifecycle, and inbox endpoints.
pub fn matching_router<R, N>(service: Arc<MatchingService<R, N>>) -> Router
where
    R: MatchingRepository + 'static,
    N: DealNotifier + 'static,
{
    Router::new()
        .route("/api/v1/match", get(match_handler::<R, N>))
        .route(
            "/api/v1/deals/transitions",
            post(transition_handler::<R, N>),
        )
        .route("/api/v1/deals/history", get(history_handler::<R, N>))
        .route(
            "/api/v1/offers/:offer_id/archive",
            post(archive_handler::<R, N>),
        )
        .route(
            "/api/v1/offers/:offer_id/activate",
            post(activate_handler::<R, N>),
        )
        .route(
            "/api/v1/requests/:request_id/cancel",
            post(cancel_handler::<R, N>),
        )
        .route(
            "/api/v1/companies/:company_id/responses",
            get(operator_inbox_handler::<R, N>),
        )
        .route(
            "/api/v1/companies/:company_id/inbox",
            get(seeker_inbox_handler::<R, N>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubjectQuery {
    pub(crate) match_id: Option<String>,
    pub(crate) request_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CancelQuery {
    comment: Option<String>,
}

pub(crate) async fn match_handler<R, N>(
    State(service): State<Arc<MatchingService<R, N>>>,
    headers: HeaderMap,
    Query(query): Query<SubjectQuery>,
) -> Response
where
    R: MatchingRepository + 'static,
    N: DealNotifier + 'static,
{
    let Some(raw) = query.request_id else {
        let payload = json!({
            "error": "requestId is required",
        });
        return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
    };

    let request_id = match parse_identifier("requestId", &raw) {
        Ok(id) => RequestId(id),
        Err(error) => return error_response(error),
    };
    let caller = match caller_company(&headers) {
        Ok(caller) => caller,
        Err(error) => return error_response(error),
    };

    match service.match_request(request_id, caller) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn transition_handler<R, N>(
    State(service): State<Arc<MatchingService<R, N>>>,
    axum::Json(command): axum::Json<TransitionCommand>,
) -> Response
where
    R: MatchingRepository + 'static,
    N: DealNotifier + 'static,
{
    match service.transition(command) {
        Ok(entry) => (StatusCode::CREATED, axum::Json(entry)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn history_handler<R, N>(
    State(service): State<Arc<MatchingService<R, N>>>,
    Query(query): Query<SubjectQuery>,
) -> Response
where
    R: MatchingRepository + 'static,
    N: DealNotifier + 'static,
{
    let subject = match subject_from_query(query) {
        Ok(subject) => subject,
        Err(error) => return error_response(error),
    };

    match service.deal_history(subject) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn archive_handler<R, N>(
    State(service): State<Arc<MatchingService<R, N>>>,
    Path(offer_id): Path<String>,
) -> Response
where
    R: MatchingRepository + 'static,
    N: DealNotifier + 'static,
{
    let result = parse_identifier("offerId", &offer_id)
        .and_then(|id| service.archive_offer(OfferId(id)));
    match result {
        Ok(offer) => (StatusCode::OK, axum::Json(offer)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn activate_handler<R, N>(
    State(service): State<Arc<MatchingService<R, N>>>,
    Path(offer_id): Path<String>,
) -> Response
where
    R: MatchingRepository + 'static,
    N: DealNotifier + 'static,
{
    let result = parse_identifier("offerId", &offer_id)
        .and_then(|id| service.activate_offer(OfferId(id)));
    match result {
        Ok(offer) => (StatusCode::OK, axum::Json(offer)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn cancel_handler<R, N>(
    State(service): State<Arc<MatchingService<R, N>>>,
    headers: HeaderMap,
    Path(request_id): Path<String>,
    Query(query): Query<CancelQuery>,
) -> Response
where
    R: MatchingRepository + 'static,
    N: DealNotifier + 'static,
{
    let result = caller_company(&headers).and_then(|caller| {
        let id = parse_identifier("requestId", &request_id)?;
        service.cancel_request(RequestId(id), caller, query.comment)
    });
    match result {
        Ok(entry) => (StatusCode::CREATED, axum::Json(entry)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn operator_inbox_handler<R, N>(
    State(service): State<Arc<MatchingService<R, N>>>,
    Path(company_id): Path<String>,
) -> Response
where
    R: MatchingRepository + 'static,
    N: DealNotifier + 'static,
{
    let result = parse_identifier("companyId", &company_id)
        .and_then(|id| service.operator_responses(CompanyId(id)));
    match result {
        Ok(entries) => (StatusCode::OK, axum::Json(entries)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn seeker_inbox_handler<R, N>(
    State(service): State<Arc<MatchingService<R, N>>>,
    Path(company_id): Path<String>,
) -> Response
where
    R: MatchingRepository + 'static,
    N: DealNotifier + 'static,
{
    let result = parse_identifier("companyId", &company_id)
        .and_then(|id| service.seeker_inbox(CompanyId(id)));
    match result {
        Ok(entries) => (StatusCode::OK, axum::Json(entries)).into_response(),
        Err(error) => error_response(error),
    }
}

fn caller_company(headers: &HeaderMap) -> Result<Option<CompanyId>, MatchingServiceError> {
    let Some(value) = headers.get(COMPANY_HEADER) else {
        return Ok(None);
    };
    let raw = value
        .to_str()
        .map_err(|_| MatchingServiceError::InvalidIdentifier {
            field: "X-Company-Id",
            value: String::from_utf8_lossy(value.as_bytes()).into_owned(),
        })?;
    parse_identifier("X-Company-Id", raw).map(|id| Some(CompanyId(id)))
}

fn subject_from_query(query: SubjectQuery) -> Result<DealSubject, MatchingServiceError> {
    let match_id = query
        .match_id
        .map(|raw| parse_identifier("matchId", &raw).map(MatchId))
        .transpose()?;
    let request_id = query
        .request_id
        .map(|raw| parse_identifier("requestId", &raw).map(RequestId))
        .transpose()?;
    Ok(DealSubject::from_parts(match_id, request_id)?)
}

fn error_response(error: MatchingServiceError) -> Response {
    let status = match &error {
        MatchingServiceError::InvalidIdentifier { .. }
        | MatchingServiceError::Lifecycle(
            LifecycleError::MissingSubject | LifecycleError::AmbiguousSubject,
        ) => StatusCode::BAD_REQUEST,
        MatchingServiceError::NotOwned { .. } => StatusCode::FORBIDDEN,
        MatchingServiceError::RequestNotFound(_)
        | MatchingServiceError::OfferNotFound(_)
        | MatchingServiceError::Lifecycle(LifecycleError::SubjectNotFound(_))
        | MatchingServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        MatchingServiceError::Lifecycle(LifecycleError::IllegalTransition { current, requested }) => {
            let payload = json!({
                "error": error.to_string(),
                "currentStatus": current,
                "requestedStatus": requested,
            });
            return (StatusCode::CONFLICT, axum::Json(payload)).into_response();
        }
        MatchingServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        MatchingServiceError::Lifecycle(LifecycleError::Repository(_))
        | MatchingServiceError::Repository(RepositoryError::Unavailable(_)) => {
            tracing::error!(error = %error, "matching request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
