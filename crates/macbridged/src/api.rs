//! HTTP surface of the daemon.
//!
//! Carries the REST states contract the macOS agent already speaks
//! (`POST /api/states/{entity_id}`) plus liveness and reconciler-health
//! endpoints for supervision.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::Path;
use axum::extract::State;
use axum::http::header;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::coordinator::Health;
use crate::registry::MemoryStateStore;
use crate::registry::StateEntry;
use crate::registry::StateStore;

/// Response for the /v1/ping endpoint
#[derive(Serialize)]
struct PingResponse {
    status: String,
}

/// Response for the /v1/info endpoint
#[derive(Serialize)]
struct InfoResponse {
    version: String,
    hostname: String,
}

/// Body of POST /api/states/{entity_id}
#[derive(Debug, Deserialize)]
struct SetStateBody {
    state: String,

    #[serde(default)]
    attributes: Map<String, Value>,
}

/// Shared application state
pub struct AppState {
    version: &'static str,
    states: Arc<MemoryStateStore>,
    health: Health,
    auth_token: Option<String>,
}

impl AppState {
    pub fn new(states: Arc<MemoryStateStore>, health: Health, auth_token: Option<String>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            states,
            health,
            auth_token,
        }
    }
}

/// Handler for GET /v1/ping
#[tracing::instrument]
async fn ping() -> impl IntoResponse {
    tracing::debug!("Handling /v1/ping request");
    (
        StatusCode::OK,
        Json(PingResponse {
            status: "ok".to_string(),
        }),
    )
}

/// Handler for GET /v1/info
#[tracing::instrument(skip(state))]
async fn info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    tracing::debug!("Handling /v1/info request");

    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    (
        StatusCode::OK,
        Json(InfoResponse {
            version: state.version.to_string(),
            hostname,
        }),
    )
}

/// Handler for GET /v1/health
///
/// 200 while the most recent reconciliation pass succeeded, 503 otherwise.
#[tracing::instrument(skip(state))]
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let status = state.health.snapshot();
    let code = if status.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}

/// Handler for GET /api/states
#[tracing::instrument(skip(state))]
async fn list_states(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.states.all().await {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Handler for GET /api/states/{entity_id}
#[tracing::instrument(skip(state))]
async fn get_state(
    State(state): State<Arc<AppState>>,
    Path(entity_id): Path<String>,
) -> impl IntoResponse {
    match state.states.get(&entity_id).await {
        Ok(Some(entry)) => (StatusCode::OK, Json(entry)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Handler for POST /api/states/{entity_id}
///
/// Upserts an entity state. 201 when the entity id is new, 200 on update,
/// matching the REST states contract.
#[tracing::instrument(skip(state, headers, body))]
async fn set_state(
    State(state): State<Arc<AppState>>,
    Path(entity_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<SetStateBody>,
) -> impl IntoResponse {
    if !authorized(&state, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let entry = StateEntry {
        entity_id,
        state: body.state,
        attributes: body.attributes,
    };
    let created = state.states.upsert(entry.clone());
    tracing::debug!(entity_id = %entry.entity_id, created, "state upserted");

    let code = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    (code, Json(entry)).into_response()
}

/// Bearer-token check for state writes. Passes when no token is configured.
fn authorized(state: &AppState, headers: &HeaderMap) -> bool {
    let Some(token) = &state.auth_token else {
        return true;
    };
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|t| t == token)
}

/// Create the API router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/ping", get(ping))
        .route("/v1/info", get(info))
        .route("/v1/health", get(health))
        .route("/api/states", get(list_states))
        .route("/api/states/:entity_id", get(get_state).post(set_state))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP API server
///
/// Binds to the specified address and serves until the shutdown signal
/// triggers.
pub async fn serve(
    listen: String,
    port: u16,
    state: AppState,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> anyhow::Result<()> {
    let app = create_router(Arc::new(state));

    let addr: SocketAddr = format!("{}:{}", listen, port).parse()?;
    tracing::info!("Starting HTTP API server on {}", addr);

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            tracing::info!("HTTP API server shutting down gracefully");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;

    fn router(auth_token: Option<&str>) -> (Router, Arc<MemoryStateStore>) {
        let states = Arc::new(MemoryStateStore::new());
        let state = AppState::new(
            states.clone(),
            Health::default(),
            auth_token.map(str::to_string),
        );
        (create_router(Arc::new(state)), states)
    }

    fn post_state(entity_id: &str, token: Option<&str>) -> Request<Body> {
        let body = serde_json::json!({
            "state": "42.0",
            "attributes": {"source": "hass_mac_sensor_agent"},
        });
        let mut builder = Request::builder()
            .method("POST")
            .uri(format!("/api/states/{entity_id}"))
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_ping() {
        let (app, _) = router(None);
        let response = app
            .oneshot(Request::get("/v1/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_unhealthy_before_first_pass() {
        let (app, _) = router(None);
        let response = app
            .oneshot(Request::get("/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_set_state_created_then_updated() {
        let (app, states) = router(None);

        let response = app
            .clone()
            .oneshot(post_state("sensor.cpu_usage", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(post_state("sensor.cpu_usage", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let entry = states.get("sensor.cpu_usage").await.unwrap().unwrap();
        assert_eq!(entry.state, "42.0");
        assert_eq!(entry.attr_str("source"), Some("hass_mac_sensor_agent"));
    }

    #[tokio::test]
    async fn test_set_state_requires_token() {
        let (app, states) = router(Some("secret"));

        let response = app
            .clone()
            .oneshot(post_state("sensor.cpu_usage", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(states.get("sensor.cpu_usage").await.unwrap().is_none());

        let response = app
            .clone()
            .oneshot(post_state("sensor.cpu_usage", Some("wrong")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(post_state("sensor.cpu_usage", Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_get_state_not_found() {
        let (app, _) = router(None);
        let response = app
            .oneshot(
                Request::get("/api/states/sensor.missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
