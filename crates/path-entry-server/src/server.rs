//! HTTP endpoints for entry form sessions

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{header, Method};
use axum::response::{IntoResponse, Json, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use moka::future::Cache;
use path_entry::{
    Entry, EntryFormSession, EntryStore, FormAction, FormPatch, FormRoute, FormValues, Geocoder,
    ReconcileOutcome,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::info;
use ts_rs::TS;

use crate::error::AppError;

const SESSION_IDLE_SECS: u64 = 30 * 60;

/// Shared state for the HTTP server
pub struct ServerState {
    pub store: Arc<dyn EntryStore>,
    pub geocoder: Arc<dyn Geocoder>,
    /// Zone the form's date and time fields are entered in
    pub tz: Tz,
    pub started_at: DateTime<Utc>,
    sessions: Cache<u64, Arc<EntryFormSession>>,
    next_session_id: AtomicU64,
}

impl ServerState {
    pub fn new(store: Arc<dyn EntryStore>, geocoder: Arc<dyn Geocoder>, tz: Tz) -> Self {
        let sessions = Cache::builder()
            .max_capacity(10_000)
            .time_to_idle(Duration::from_secs(SESSION_IDLE_SECS))
            .build();

        Self {
            store,
            geocoder,
            tz,
            started_at: Utc::now(),
            sessions,
            next_session_id: AtomicU64::new(1),
        }
    }

    async fn session(&self, id: u64) -> Result<Arc<EntryFormSession>, AppError> {
        self.sessions
            .get(&id)
            .await
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
    }
}

pub type SharedState = Arc<ServerState>;

#[derive(Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct HealthResponse {
    status: String,
    #[ts(type = "number")]
    uptime_secs: u64,
    #[ts(type = "number")]
    open_sessions: u64,
}

#[derive(Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct OpenSessionRequest {
    /// `"new"` or the index of the entry to edit
    action: String,
    #[ts(optional)]
    page: Option<String>,
    #[serde(default)]
    inline: bool,
}

#[derive(Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct SessionResponse {
    #[ts(type = "number")]
    id: u64,
    submit_label: String,
    values: FormValues,
}

#[derive(Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ReconcileResponse {
    outcome: ReconcileOutcome,
    values: FormValues,
}

async fn session_response(id: u64, session: &EntryFormSession) -> SessionResponse {
    SessionResponse {
        id,
        submit_label: session.route().submit_label().to_string(),
        values: session.values().await,
    }
}

/// Create the HTTP router
pub fn create_router(state: SharedState, cors_origins: &[String]) -> Router {
    let cors = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PATCH])
            .allow_headers([header::CONTENT_TYPE])
    };

    Router::new()
        .route("/health", get(health))
        .route("/api/entries", get(list_entries))
        .route("/api/sessions", post(open_session))
        .route("/api/sessions/{id}", get(get_session).patch(patch_session))
        .route("/api/sessions/{id}/validate", post(validate_session))
        .route("/api/sessions/{id}/reverse-geocode", post(reverse_geocode))
        .route("/api/sessions/{id}/forward-geocode", post(forward_geocode))
        .route("/api/sessions/{id}/submit", post(submit_session))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(state: SharedState, port: u16, cors_origins: &[String]) -> std::io::Result<()> {
    let router = create_router(state, cors_origins);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await
}

async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let uptime_secs = (Utc::now() - state.started_at).num_seconds() as u64;

    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs,
        open_sessions: state.sessions.entry_count(),
    })
}

async fn list_entries(State(state): State<SharedState>) -> Json<Vec<Entry>> {
    Json(state.store.entries().await)
}

async fn open_session(
    State(state): State<SharedState>,
    Json(body): Json<OpenSessionRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let action: FormAction = body.action.parse().map_err(AppError::BadRequest)?;
    let route = FormRoute::new(action, body.page, body.inline);

    let session = EntryFormSession::open(
        route,
        state.store.as_ref(),
        state.geocoder.clone(),
        state.tz,
    )
    .await
    .map_err(|e| AppError::NotFound(e.to_string()))?;

    let id = state.next_session_id.fetch_add(1, Ordering::SeqCst);
    let session = Arc::new(session);
    state.sessions.insert(id, session.clone()).await;
    info!(id, %action, "Opened entry form");

    Ok(Json(session_response(id, &session).await))
}

async fn get_session(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state.session(id).await?;
    Ok(Json(session_response(id, &session).await))
}

async fn patch_session(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(patch): Json<FormPatch>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state.session(id).await?;
    session.apply_patch(patch).await;
    Ok(Json(session_response(id, &session).await))
}

async fn validate_session(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let session = state.session(id).await?;
    session.validate().await?;
    Ok(Json(serde_json::json!({ "valid": true })))
}

async fn reverse_geocode(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
) -> Result<Json<ReconcileResponse>, AppError> {
    let session = state.session(id).await?;
    let outcome = session.reverse_geocode().await;
    Ok(Json(ReconcileResponse {
        outcome,
        values: session.values().await,
    }))
}

async fn forward_geocode(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
) -> Result<Json<ReconcileResponse>, AppError> {
    let session = state.session(id).await?;
    let outcome = session.forward_geocode().await;
    Ok(Json(ReconcileResponse {
        outcome,
        values: session.values().await,
    }))
}

/// Dispatch the entry and send the browser home.
///
/// The session is taken out of the registry first so a repeated submit
/// cannot dispatch it twice. It goes back only when validation fails.
async fn submit_session(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
) -> Result<Response, AppError> {
    let session = state
        .sessions
        .remove(&id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;

    match session.submit(state.store.as_ref()).await {
        Ok(submission) => Ok(Redirect::to(submission.redirect_to).into_response()),
        Err(errors) => {
            state.sessions.insert(id, session).await;
            Err(errors.into())
        }
    }
}
