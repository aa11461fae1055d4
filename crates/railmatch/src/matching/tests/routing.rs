use super::common::*;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{Request, StatusCode};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use crate::matching::router::{history_handler, SubjectQuery};
use crate::matching::scoring::MatchingConfig;
use crate::matching::{DealStatus, MatchingService, TransitionCommand};

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, payload: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn match_route_returns_scored_candidates() {
    let (service, _, _) = build_service();
    let router = matching_router_with_service(service);

    let response = router
        .oneshot(get("/api/v1/match?requestId=100"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["requestId"], 100);
    assert_eq!(payload["count"], 2);
    assert_eq!(payload["matches"][0]["offerId"], 1);
    assert_eq!(payload["matches"][0]["reasons"].as_array().map(Vec::len), Some(5));
    assert!(payload["matches"][0]["metadata"]["priceMatch"].is_number());
    assert_eq!(payload["requestDetails"]["cargoType"], "METAL");
}

#[tokio::test]
async fn match_route_rejects_malformed_identifier() {
    let (service, _, _) = build_service();
    let router = matching_router_with_service(service);

    let response = router
        .oneshot(get("/api/v1/match?requestId=abc"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "invalid requestId 'abc'");
}

#[tokio::test]
async fn match_route_requires_request_id() {
    let (service, _, _) = build_service();
    let router = matching_router_with_service(service);

    let response = router
        .oneshot(get("/api/v1/match"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn match_route_enforces_ownership_header() {
    let (service, _, _) = build_service();
    let router = matching_router_with_service(service);

    let response = router
        .oneshot(
            Request::get("/api/v1/match?requestId=100")
                .header("X-Company-Id", OPERATOR.0.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn match_route_returns_not_found_for_unknown_request() {
    let (service, _, _) = build_service();
    let router = matching_router_with_service(service);

    let response = router
        .oneshot(get("/api/v1/match?requestId=999"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn transition_route_records_and_rejects() {
    let (service, _, _) = build_service();
    let router = matching_router_with_service(service);

    let created = router
        .clone()
        .oneshot(post_json(
            "/api/v1/deals/transitions",
            json!({ "requestId": 100, "status": "NEGOTIATING", "comment": "обсудим цену" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(created.status(), StatusCode::CREATED);
    let entry = read_json_body(created).await;
    assert_eq!(entry["status"], "NEGOTIATING");
    assert_eq!(entry["requestId"], 100);

    let conflict = router
        .oneshot(post_json(
            "/api/v1/deals/transitions",
            json!({ "requestId": 100, "status": "PENDING" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(conflict.status(), StatusCode::CONFLICT);
    let payload = read_json_body(conflict).await;
    assert_eq!(payload["currentStatus"], "NEGOTIATING");
    assert_eq!(payload["requestedStatus"], "PENDING");
}

#[tokio::test]
async fn transition_route_rejects_ambiguous_subject() {
    let (service, _, _) = build_service();
    let router = matching_router_with_service(service);

    let response = router
        .oneshot(post_json(
            "/api/v1/deals/transitions",
            json!({ "matchId": 1, "requestId": 100, "status": "ACCEPTED" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn history_route_reports_current_status() {
    let (service, _, _) = build_service();
    service
        .transition(TransitionCommand {
            match_id: None,
            request_id: Some(crate::matching::RequestId(100)),
            status: DealStatus::Accepted,
            comment: None,
        })
        .expect("transition allowed");
    let router = matching_router_with_service(service);

    let response = router
        .oneshot(get("/api/v1/deals/history?requestId=100"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["currentStatus"], "ACCEPTED");
    assert_eq!(payload["history"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn history_handler_returns_internal_error_on_repository_failure() {
    let service = Arc::new(MatchingService::new(
        Arc::new(UnavailableRepository),
        Arc::new(MemoryNotifier::default()),
        MatchingConfig::default(),
    ));

    let response = history_handler::<UnavailableRepository, MemoryNotifier>(
        State(service),
        Query(SubjectQuery {
            match_id: Some("1".to_string()),
            request_id: None,
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn archive_routes_toggle_offer() {
    let (service, repository, _) = build_service();
    let router = matching_router_with_service(service);

    let archived = router
        .clone()
        .oneshot(Request::post("/api/v1/offers/1/archive").body(Body::empty()).unwrap())
        .await
        .expect("route executes");
    assert_eq!(archived.status(), StatusCode::OK);
    assert_eq!(read_json_body(archived).await["isArchived"], true);

    let missing = router
        .clone()
        .oneshot(Request::post("/api/v1/offers/42/activate").body(Body::empty()).unwrap())
        .await
        .expect("route executes");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let activated = router
        .oneshot(Request::post("/api/v1/offers/1/activate").body(Body::empty()).unwrap())
        .await
        .expect("route executes");
    assert_eq!(activated.status(), StatusCode::OK);
    assert!(crate::matching::MatchingRepository::active_offers(repository.as_ref())
        .expect("offers")
        .iter()
        .any(|offer| offer.id == crate::matching::OfferId(1)));
}

#[tokio::test]
async fn cancel_route_requires_open_thread() {
    let (service, _, _) = build_service();
    let router = matching_router_with_service(service);

    let response = router
        .oneshot(
            Request::post("/api/v1/requests/100/cancel?comment=no%20longer%20needed")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn cancel_route_enforces_ownership_header() {
    let (service, repository, _) = build_service();
    service
        .transition(TransitionCommand {
            match_id: None,
            request_id: Some(crate::matching::RequestId(100)),
            status: DealStatus::Negotiating,
            comment: None,
        })
        .expect("negotiation opens");
    let router = matching_router_with_service(service);

    let foreign = router
        .clone()
        .oneshot(
            Request::post("/api/v1/requests/100/cancel")
                .header("X-Company-Id", OTHER_OPERATOR.0.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(foreign.status(), StatusCode::FORBIDDEN);
    assert_eq!(repository.history_len(), 1);

    let malformed = router
        .clone()
        .oneshot(
            Request::post("/api/v1/requests/100/cancel")
                .header("X-Company-Id", "acme")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);

    let owner = router
        .oneshot(
            Request::post("/api/v1/requests/100/cancel")
                .header("X-Company-Id", SEEKER.0.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(owner.status(), StatusCode::CREATED);
    assert_eq!(read_json_body(owner).await["status"], "CANCELLED");
}

#[tokio::test]
async fn inbox_routes_list_party_matches() {
    let (service, _, _) = build_service();
    service
        .match_request(crate::matching::RequestId(100), None)
        .expect("matching succeeds");
    let router = matching_router_with_service(service);

    let operator = router
        .clone()
        .oneshot(get(&format!("/api/v1/companies/{}/responses", OPERATOR.0)))
        .await
        .expect("route executes");
    assert_eq!(operator.status(), StatusCode::OK);
    assert_eq!(read_json_body(operator).await.as_array().map(Vec::len), Some(1));

    let seeker = router
        .oneshot(get(&format!("/api/v1/companies/{}/inbox", SEEKER.0)))
        .await
        .expect("route executes");
    let payload = read_json_body(seeker).await;
    assert_eq!(payload.as_array().map(Vec::len), Some(2));
    assert_eq!(payload[0]["currentStatus"], "PENDING");
}
