//! HTTP surface: routes, shared state, and thin handlers over the core services.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::auth::{AuthGate, BearerTokenGate};
use crate::booking::webhook::{CalendarEvent, SharedSecretVerifier, WebhookVerifier};
use crate::booking::{
    BookingService, CompletionOutcome, ExpiryPolicy, HttpMeetingStore, LocalMeetingStore,
    MeetingMaterializer, MeetingStore,
};
use crate::config::{AppConfig, MeetingStoreMode};
use crate::domain::{
    BookingSession, Client, ClientStatus, Introduction, IntroductionStatus, Investor,
    InvestorPatch, Meeting, MeetingData, MeetingDraft, NewBookingSession, NewClient, NewInvestor,
    Provenance,
};
use crate::error::{Result, RouterError};
use crate::introductions::{IntroductionFilter, IntroductionLedger, NewIntroduction};
use crate::matching::{MatchRequest, MatchResult, MatchingEngine};
use crate::store::{in_memory, SharedCollection};

#[derive(Clone)]
pub struct AppState {
    pub investors: SharedCollection<Investor>,
    pub clients: SharedCollection<Client>,
    pub matching: MatchingEngine,
    pub introductions: IntroductionLedger,
    pub bookings: BookingService,
    pub meetings: Arc<dyn MeetingStore>,
    pub auth: Arc<dyn AuthGate>,
    pub webhook: Arc<dyn WebhookVerifier>,
    pub calendar_url: Arc<str>,
    pub expiry: Option<ExpiryPolicy>,
}

impl AppState {
    /// In-memory collections wired around the given Meeting Store.
    pub fn new(cfg: &AppConfig, meetings: Arc<dyn MeetingStore>) -> Self {
        let investors = in_memory::<Investor>();
        let clients = in_memory::<Client>();

        let materializer = MeetingMaterializer::new(
            meetings.clone(),
            cfg.calendar.source.clone(),
            cfg.calendar.default_owner.clone(),
            cfg.meeting_store.timeout(),
        );

        Self {
            matching: MatchingEngine::new(investors.clone(), clients.clone()),
            introductions: IntroductionLedger::new(
                in_memory::<Introduction>(),
                investors.clone(),
                clients.clone(),
            ),
            bookings: BookingService::new(in_memory::<BookingSession>(), materializer),
            investors,
            clients,
            meetings,
            auth: Arc::new(BearerTokenGate::new(cfg.secrets.admin_token.as_deref())),
            webhook: Arc::new(SharedSecretVerifier::new(
                cfg.secrets.webhook_secret.as_deref(),
            )),
            calendar_url: Arc::from(cfg.calendar.url.as_str()),
            expiry: ExpiryPolicy::from_secs(cfg.booking.pending_ttl_secs),
        }
    }

    /// Pick the Meeting Store from config (local collection or remote API).
    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        reqwest::Url::parse(&cfg.calendar.url)
            .with_context(|| format!("calendar.url is not a valid URL: {}", cfg.calendar.url))?;

        let meetings: Arc<dyn MeetingStore> = match cfg.meeting_store.mode {
            MeetingStoreMode::Local => Arc::new(LocalMeetingStore::new(in_memory::<Meeting>())),
            MeetingStoreMode::Http => {
                let base = cfg
                    .meeting_store
                    .base_url
                    .as_deref()
                    .context("meeting_store.base_url missing")?;
                Arc::new(HttpMeetingStore::new(base, cfg.meeting_store.timeout())?)
            }
        };
        Ok(Self::new(cfg, meetings))
    }
}

/// `axum::Json` whose rejection renders as a `RouterError` body.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(RouterError))]
struct JsonBody<T>(T);

/// `axum::extract::Query` whose rejection renders as a `RouterError` body.
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(RouterError))]
struct QueryParams<T>(T);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/matches", get(matches_query).post(matches_body))
        .route("/investors", get(list_investors).post(create_investor))
        .route("/investors/{id}", get(get_investor).patch(update_investor))
        .route("/clients", get(list_clients).post(create_client))
        .route("/clients/{id}", get(get_client))
        .route("/clients/{id}/status", patch(set_client_status))
        .route(
            "/introductions",
            get(list_introductions).post(create_introduction),
        )
        .route("/introductions/{id}", get(get_introduction))
        .route("/introductions/{id}/status", patch(set_introduction_status))
        .route(
            "/booking-sessions",
            get(list_booking_sessions).post(create_booking_session),
        )
        .route("/booking-sessions/expire", post(expire_booking_sessions))
        .route("/booking-sessions/{session_id}", get(get_booking_session))
        .route(
            "/booking-sessions/{session_id}/complete",
            post(complete_booking_session),
        )
        .route("/book", get(book_redirect))
        .route("/webhooks/calendar", post(calendar_webhook))
        .route("/meetings", get(list_meetings).post(create_meeting))
        .route("/meetings/{id}", get(get_meeting))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

// ---- matching ----

async fn matches_query(
    State(state): State<AppState>,
    QueryParams(req): QueryParams<MatchRequest>,
) -> Result<Json<MatchResult>> {
    Ok(Json(state.matching.find_matches(&req).await?))
}

async fn matches_body(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<MatchRequest>,
) -> Result<Json<MatchResult>> {
    Ok(Json(state.matching.find_matches(&req).await?))
}

// ---- investors ----

async fn list_investors(State(state): State<AppState>) -> Result<Json<Vec<Investor>>> {
    Ok(Json(state.investors.list().await?))
}

async fn create_investor(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<NewInvestor>,
) -> Result<(StatusCode, Json<Investor>)> {
    let inv = body.into_investor(Utc::now())?;
    let inv = state.investors.insert(inv).await?;
    tracing::info!(target: "api", id = %inv.id, "investor created");
    Ok((StatusCode::CREATED, Json(inv)))
}

async fn get_investor(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Investor>> {
    state
        .investors
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| RouterError::not_found("investor", id))
}

async fn update_investor(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<InvestorPatch>,
) -> Result<Json<Investor>> {
    let now = Utc::now();
    let inv = state
        .investors
        .update(&id, Box::new(move |inv: &mut Investor| patch.apply(inv, now)))
        .await?;
    Ok(Json(inv))
}

// ---- clients (admin) ----

async fn list_clients(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Client>>> {
    state.auth.require(&headers)?;
    Ok(Json(state.clients.list().await?))
}

async fn create_client(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(body): JsonBody<NewClient>,
) -> Result<(StatusCode, Json<Client>)> {
    state.auth.require(&headers)?;
    let client = state.clients.insert(body.into_client(Utc::now())?).await?;
    tracing::info!(target: "api", id = %client.id, "client created");
    Ok((StatusCode::CREATED, Json(client)))
}

async fn get_client(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Client>> {
    state.auth.require(&headers)?;
    state
        .clients
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| RouterError::not_found("client", id))
}

#[derive(Deserialize)]
struct ClientStatusBody {
    status: ClientStatus,
}

async fn set_client_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<ClientStatusBody>,
) -> Result<Json<Client>> {
    state.auth.require(&headers)?;
    let now = Utc::now();
    let client = state
        .clients
        .update(
            &id,
            Box::new(move |c: &mut Client| c.transition(body.status, now)),
        )
        .await?;
    tracing::info!(target: "api", id = %client.id, status = ?client.status, "client status changed");
    Ok(Json(client))
}

// ---- introductions ----

async fn list_introductions(
    State(state): State<AppState>,
    QueryParams(filter): QueryParams<IntroductionFilter>,
) -> Result<Json<Vec<Introduction>>> {
    Ok(Json(state.introductions.list(&filter).await?))
}

async fn create_introduction(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<NewIntroduction>,
) -> Result<(StatusCode, Json<Introduction>)> {
    let intro = state.introductions.create(body).await?;
    Ok((StatusCode::CREATED, Json(intro)))
}

async fn get_introduction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Introduction>> {
    Ok(Json(state.introductions.get(&id).await?))
}

#[derive(Deserialize)]
struct IntroductionStatusBody {
    status: IntroductionStatus,
}

async fn set_introduction_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<IntroductionStatusBody>,
) -> Result<Json<Introduction>> {
    Ok(Json(state.introductions.set_status(&id, body.status).await?))
}

// ---- booking sessions ----

async fn list_booking_sessions(
    State(state): State<AppState>,
) -> Result<Json<Vec<BookingSession>>> {
    Ok(Json(state.bookings.list().await?))
}

async fn create_booking_session(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<NewBookingSession>,
) -> Result<(StatusCode, Json<BookingSession>)> {
    let session = state.bookings.create(body).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn get_booking_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<BookingSession>> {
    Ok(Json(state.bookings.get(&session_id).await?))
}

async fn complete_booking_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    JsonBody(data): JsonBody<MeetingData>,
) -> Result<Json<CompletionOutcome>> {
    Ok(Json(state.bookings.complete(&session_id, data).await?))
}

#[derive(Serialize)]
struct ExpireOut {
    expired: Vec<String>,
}

async fn expire_booking_sessions(State(state): State<AppState>) -> Result<Json<ExpireOut>> {
    let policy = state
        .expiry
        .ok_or_else(|| RouterError::bad_request("booking session expiry is disabled"))?;
    let expired = state.bookings.expire_stale(&policy, Utc::now()).await?;
    Ok(Json(ExpireOut { expired }))
}

/// Landing-page entry: open a pending session carrying the query's UTM
/// provenance, then send the prospect to the calendar with the session id.
async fn book_redirect(
    State(state): State<AppState>,
    QueryParams(provenance): QueryParams<Provenance>,
) -> Result<Redirect> {
    let mut url = reqwest::Url::parse(&state.calendar_url)
        .map_err(|e| RouterError::Storage(format!("calendar url: {e}")))?;

    let session = state
        .bookings
        .create(NewBookingSession {
            session_id: Some(uuid::Uuid::new_v4().to_string()),
            provenance,
            calendar_url: Some(state.calendar_url.to_string()),
            status: None,
        })
        .await?;

    {
        let p = &session.provenance;
        let mut q = url.query_pairs_mut();
        q.append_pair("session_id", &session.session_id);
        for (k, v) in [
            ("utm_source", &p.utm_source),
            ("utm_medium", &p.utm_medium),
            ("utm_campaign", &p.utm_campaign),
            ("utm_content", &p.utm_content),
            ("name", &p.prospect_name),
            ("email", &p.prospect_email),
        ] {
            if let Some(v) = v {
                q.append_pair(k, v);
            }
        }
    }
    Ok(Redirect::temporary(url.as_str()))
}

async fn calendar_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    if !state.webhook.verify(&headers, &body) {
        tracing::warn!(target: "booking", "calendar webhook rejected by verifier");
        return Err(RouterError::Unauthorized);
    }
    let event: CalendarEvent = serde_json::from_slice(&body)
        .map_err(|e| RouterError::bad_request(format!("invalid webhook body: {e}")))?;

    if !event.is_booking() {
        tracing::debug!(target: "booking", event = %event.event, "calendar webhook ignored");
        return Ok(StatusCode::ACCEPTED.into_response());
    }
    let outcome = state.bookings.complete(&event.session_id, event.meeting).await?;
    Ok(Json(outcome).into_response())
}

// ---- meetings ----

async fn list_meetings(State(state): State<AppState>) -> Result<Json<Vec<Meeting>>> {
    Ok(Json(state.meetings.list().await?))
}

async fn create_meeting(
    State(state): State<AppState>,
    JsonBody(mut draft): JsonBody<MeetingDraft>,
) -> Result<(StatusCode, Json<Meeting>)> {
    if draft.owner.trim().is_empty() {
        draft.owner = state.bookings.materializer().owner().to_string();
    }
    let meeting = state.meetings.create(draft).await?;
    Ok((StatusCode::CREATED, Json(meeting)))
}

async fn get_meeting(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Meeting>> {
    state
        .meetings
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| RouterError::not_found("meeting", id))
}
