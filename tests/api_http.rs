// tests/api_http.rs
//
// HTTP-level tests for the public Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - GET/POST /matches (validation, investor lookup, 404 on unknown investor)
// - /clients admin gate (401 without token, 200 with bearer)
// - /introductions referential checks
// - booking-session create -> complete -> meeting listed
// - GET /book redirect carries session_id + UTM
// - POST /webhooks/calendar secret check, non-booking events acknowledged
// - POST /booking-sessions/expire (enabled and disabled)
// - malformed query strings / JSON bodies rendered as the JSON error shape

use std::path::Path;
use std::sync::Arc;

use axum::{
    body::{self, Body},
    Router,
};
use http::{header, Request, StatusCode};
use serde_json::json;
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use lead_router::booking::LocalMeetingStore;
use lead_router::seed::SeedFile;
use lead_router::store::in_memory;
use lead_router::{api, AppConfig, AppState};

const BODY_LIMIT: usize = 1024 * 1024;
const ADMIN: &str = "admin-test-token";
const HOOK: &str = "hook-test-secret";

/// Router over in-memory state seeded from config/seed.json.
async fn test_router() -> Router {
    router_with(|_| {}).await
}

async fn router_with(tweak: impl FnOnce(&mut AppConfig)) -> Router {
    let mut cfg = AppConfig::default();
    cfg.calendar.url = "https://calendly.com/acme/intro".into();
    cfg.secrets.admin_token = Some(ADMIN.into());
    cfg.secrets.webhook_secret = Some(HOOK.into());
    tweak(&mut cfg);

    let state = AppState::new(&cfg, Arc::new(LocalMeetingStore::new(in_memory())));
    SeedFile::load_from(Path::new("config/seed.json"))
        .expect("seed file")
        .apply(&state.investors, &state.clients)
        .await
        .expect("apply seed");
    api::router(state)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Json) {
    let resp = app.clone().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let json = if bytes.is_empty() {
        Json::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Json::Null)
    };
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET")
}

fn post_json(uri: &str, payload: &Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST")
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = test_router().await;
    let resp = app.oneshot(get("/health")).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    assert_eq!(String::from_utf8(bytes).expect("utf8").trim(), "OK");
}

#[tokio::test]
async fn matches_without_params_is_400_with_error_body() {
    let app = test_router().await;
    let (status, body) = send(&app, get("/matches")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
    assert!(body["message"].as_str().is_some());
}

#[tokio::test]
async fn matches_by_investor_returns_seeded_client() {
    let app = test_router().await;
    let (status, body) = send(&app, get("/matches?investorId=inv-northstar")).await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["total"], 1);
    assert_eq!(body["matches"][0]["id"], "cl-neuralops");
    assert_eq!(body["investor"]["id"], "inv-northstar");
}

#[tokio::test]
async fn matches_post_body_with_ad_hoc_criteria() {
    let app = test_router().await;
    let (status, body) = send(
        &app,
        post_json("/matches", &json!({ "sector": "Healthcare", "stage": "Seed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["total"], 1);
    assert_eq!(body["matches"][0]["id"], "cl-carepath");
}

#[tokio::test]
async fn matches_unknown_investor_is_404() {
    let app = test_router().await;
    let (status, body) = send(&app, get("/matches?investorId=nobody")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn clients_require_admin_bearer() {
    let app = test_router().await;

    let (status, _) = send(&app, get("/clients")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let wrong = Request::builder()
        .uri("/clients")
        .header(header::AUTHORIZATION, "Bearer nope")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let ok = Request::builder()
        .uri("/clients")
        .header(header::AUTHORIZATION, format!("Bearer {ADMIN}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, ok).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn introductions_validate_references() {
    let app = test_router().await;

    let (status, _) = send(
        &app,
        post_json(
            "/introductions",
            &json!({ "investorId": "inv-northstar", "clientId": "ghost" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, intro) = send(
        &app,
        post_json(
            "/introductions",
            &json!({ "investorId": "inv-northstar", "clientId": "cl-neuralops" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "body: {intro}");
    assert_eq!(intro["status"], "pending");

    let (status, list) = send(&app, get("/introductions?clientId=cl-neuralops")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn booking_session_complete_materializes_meeting() {
    let app = test_router().await;

    let (status, s) = send(
        &app,
        post_json(
            "/booking-sessions",
            &json!({ "session_id": "s1", "utm_source": "linkedin", "prospect_name": "Jane Doe" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "body: {s}");
    assert_eq!(s["status"], "pending");

    let (status, _) = send(&app, post_json("/booking-sessions", &json!({ "session_id": "s1" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, out) = send(
        &app,
        post_json(
            "/booking-sessions/s1/complete",
            &json!({ "id": "m1", "title": "Discovery Call", "date": "2025-01-01", "time": "10:00 AM" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {out}");
    assert_eq!(out["booking_session"]["status"], "completed");
    assert_eq!(out["meeting"]["title"], "Discovery Call");
    assert_eq!(out["meeting"]["source"], "calendly");
    assert_eq!(out["meeting"]["utm_source"], "linkedin");

    let (status, _) = send(
        &app,
        post_json(
            "/booking-sessions/s1/complete",
            &json!({ "title": "Discovery Call", "date": "2025-01-01", "time": "10:00 AM" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, meetings) = send(&app, get("/meetings")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(meetings.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn book_redirects_to_calendar_with_session_id() {
    let app = test_router().await;
    let resp = app
        .clone()
        .oneshot(get("/book?utm_source=newsletter&utm_campaign=q1"))
        .await
        .expect("oneshot /book");
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);

    let location = resp
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string();
    assert!(location.starts_with("https://calendly.com/acme/intro?"));
    assert!(location.contains("session_id="));
    assert!(location.contains("utm_source=newsletter"));

    let (_, sessions) = send(&app, get("/booking-sessions")).await;
    let sessions = sessions.as_array().cloned().unwrap_or_default();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["utm_campaign"], "q1");
    assert_eq!(sessions[0]["status"], "pending");
}

#[tokio::test]
async fn calendar_webhook_checks_shared_secret() {
    let app = test_router().await;
    send(&app, post_json("/booking-sessions", &json!({ "session_id": "wh1" }))).await;

    let event = json!({
        "event": "invitee.created",
        "session_id": "wh1",
        "meeting": { "title": "Intro", "date": "2025-02-03", "time": "09:30" }
    });

    let (status, _) = send(&app, post_json("/webhooks/calendar", &event)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let signed = Request::builder()
        .method("POST")
        .uri("/webhooks/calendar")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-webhook-secret", HOOK)
        .body(Body::from(event.to_string()))
        .unwrap();
    let (status, out) = send(&app, signed).await;
    assert_eq!(status, StatusCode::OK, "body: {out}");
    assert_eq!(out["booking_session"]["status"], "completed");
    assert_eq!(out["meeting"]["booking_session_id"], "wh1");
}

fn signed_webhook(event: &Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/webhooks/calendar")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-webhook-secret", HOOK)
        .body(Body::from(event.to_string()))
        .unwrap()
}

#[tokio::test]
async fn calendar_webhook_acknowledges_non_booking_events() {
    let app = test_router().await;
    send(&app, post_json("/booking-sessions", &json!({ "session_id": "wh2" }))).await;

    let resp = app
        .clone()
        .oneshot(signed_webhook(&json!({ "event": "invitee.canceled", "session_id": "wh2" })))
        .await
        .expect("oneshot webhook");
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let (_, s) = send(&app, get("/booking-sessions/wh2")).await;
    assert_eq!(s["status"], "pending");
    let (_, meetings) = send(&app, get("/meetings")).await;
    assert_eq!(meetings.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn expire_endpoint_leaves_fresh_sessions_pending() {
    let app = test_router().await;
    send(&app, post_json("/booking-sessions", &json!({ "session_id": "fresh" }))).await;

    let (status, out) = send(&app, post_json("/booking-sessions/expire", &json!({}))).await;
    assert_eq!(status, StatusCode::OK, "body: {out}");
    assert_eq!(out["expired"], json!([]));

    let (_, s) = send(&app, get("/booking-sessions/fresh")).await;
    assert_eq!(s["status"], "pending");
}

#[tokio::test]
async fn expire_endpoint_is_400_when_expiry_disabled() {
    let app = router_with(|cfg| cfg.booking.pending_ttl_secs = 0).await;
    let (status, body) = send(&app, post_json("/booking-sessions/expire", &json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn unparsable_match_query_is_json_bad_request() {
    let app = test_router().await;
    let resp = app
        .clone()
        .oneshot(get("/matches?investmentMin=abc"))
        .await
        .expect("oneshot /matches");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let ct = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(ct.starts_with("application/json"), "content-type: {ct}");

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    let body: Json = serde_json::from_slice(&bytes).expect("json error body");
    assert_eq!(body["error"], "bad_request");
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
}

#[tokio::test]
async fn malformed_json_bodies_are_bad_request() {
    let app = test_router().await;

    let (status, body) = send(&app, post_json("/matches", &json!({ "investmentMin": "x" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let broken = Request::builder()
        .method("POST")
        .uri("/booking-sessions")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, broken).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let no_ct = Request::builder()
        .method("POST")
        .uri("/introductions")
        .body(Body::from("{}"))
        .unwrap();
    let (status, body) = send(&app, no_ct).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}
