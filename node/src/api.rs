//! # HTTP API
//!
//! Builds the axum router that exposes the node's authentication interface.
//! All endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path               | Description                                  |
//! |--------|--------------------|----------------------------------------------|
//! | GET    | `/health`          | Liveness probe                               |
//! | GET    | `/status`          | Version, algorithms, master public key, time |
//! | POST   | `/auth`            | Register or log in (form body)               |
//! | GET    | `/session`         | Check the session cookie                     |
//! | GET    | `/aliases/:alias`  | Public key that owns an alias                |
//!
//! `POST /auth` answers `200` with `{ ok: true, ... }` and a `Set-Cookie`
//! header on success, `422` with `{ ok: false, result }` otherwise. The
//! `result` of a failure is either a message or a field → problem map.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

use keyseal_protocol::config::{KEY_EXCHANGE_ALGORITHM, SIGNING_ALGORITHM, SYMMETRIC_ALGORITHM};
use keyseal_protocol::identity::{IdentityService, SessionIssuer};

use crate::metrics::SharedMetrics;
use crate::session::CookieSessionIssuer;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone: everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// Registration, validation and alias lookup.
    pub service: IdentityService,
    /// Turns session payloads into `Set-Cookie` values and back.
    pub issuer: Arc<dyn SessionIssuer>,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/auth", post(auth_handler))
        .route("/session", get(session_handler))
        .route("/aliases/:alias", get(alias_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub version: String,
    pub algorithms: Algorithms,
    #[serde(rename = "masterPub")]
    pub master_pub: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct Algorithms {
    pub signing: &'static str,
    #[serde(rename = "keyExchange")]
    pub key_exchange: &'static str,
    pub symmetric: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub ok: bool,
    #[serde(rename = "colorCode", skip_serializing_if = "Option::is_none")]
    pub color_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AliasResponse {
    pub alias: String,
    pub owner: String,
}

fn error_json(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({ "ok": false, "result": message })),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: returns 200 if the node is alive.
///
/// This is the liveness probe for orchestrators (k8s, systemd, etc.).
/// It intentionally does not touch the store.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status`: version, algorithm suite and the master public key, so
/// operators can check which keys a node was started with.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatusResponse {
        version: state.version.clone(),
        algorithms: Algorithms {
            signing: SIGNING_ALGORITHM,
            key_exchange: KEY_EXCHANGE_ALGORITHM,
            symmetric: SYMMETRIC_ALGORITHM,
        },
        master_pub: state.service.master().public_key_hex(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// `POST /auth`: the single authentication entry point.
///
/// A form with `alias` registers; a form with `pub` + `priv` logs in. Both
/// also need `secretPhrase` and `colorCode`.
async fn auth_handler(
    State(state): State<AppState>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let request_id = Uuid::new_v4();
    let started = Instant::now();

    let authenticated = state
        .service
        .authenticate(&form)
        .instrument(tracing::info_span!("auth", %request_id))
        .await;

    let ok = authenticated.outcome.ok;
    state
        .metrics
        .record(authenticated.kind, ok, started.elapsed().as_secs_f64());

    let cookie = match authenticated.issue_session(state.issuer.as_ref()) {
        Ok(cookie) => cookie,
        Err(e) => {
            tracing::error!(%request_id, error = %e, "could not issue session cookie");
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, "could not create session");
        }
    };

    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    let mut response = (status, Json(authenticated.outcome)).into_response();

    if let Some(cookie) = cookie {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().insert(header::SET_COOKIE, value);
            }
            Err(e) => {
                tracing::error!(%request_id, error = %e, "session cookie is not a valid header");
                return error_json(StatusCode::INTERNAL_SERVER_ERROR, "could not create session");
            }
        }
    }

    tracing::info!(%request_id, ok, kind = ?authenticated.kind, "auth request handled");
    response
}

/// `GET /session`: 200 with the colour code if the session cookie is
/// present and intact, 401 otherwise.
async fn session_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let value = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .find_map(CookieSessionIssuer::cookie_value);

    let Some(value) = value else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(SessionResponse {
                ok: false,
                color_code: None,
            }),
        )
            .into_response();
    };

    match state.issuer.read(value) {
        Ok(payload) => Json(SessionResponse {
            ok: true,
            color_code: Some(payload.color_code),
        })
        .into_response(),
        Err(e) => {
            tracing::debug!(error = %e, "session cookie rejected");
            (
                StatusCode::UNAUTHORIZED,
                Json(SessionResponse {
                    ok: false,
                    color_code: None,
                }),
            )
                .into_response()
        }
    }
}

/// `GET /aliases/:alias`: owning public key, or 404.
async fn alias_handler(State(state): State<AppState>, Path(alias): Path<String>) -> Response {
    match state.service.lookup_alias(&alias).await {
        Ok(Some(owner)) => Json(AliasResponse { alias, owner }).into_response(),
        Ok(None) => error_json(StatusCode::NOT_FOUND, "Alias Not Found"),
        Err(e) => {
            tracing::warn!(error = %e, "alias lookup failed");
            error_json(StatusCode::SERVICE_UNAVAILABLE, &e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
