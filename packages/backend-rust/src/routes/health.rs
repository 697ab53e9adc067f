use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::db::HealthCheckSnapshot;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/info", get(info))
        .route("/live", get(live))
        .route("/ready", get(ready))
}

async fn root(State(state): State<AppState>) -> Response {
    let database = database_status(state.store().health().await.as_ref());
    let ok = database != "disconnected";

    let response = HealthResponse {
        status: if ok { "ok" } else { "degraded" },
        database,
        store: state.store().kind(),
        timestamp: now_iso(),
    };

    let status_code = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(response)).into_response()
}

async fn info(State(state): State<AppState>) -> Response {
    let start_time: chrono::DateTime<chrono::Utc> = state.started_at_system().into();

    Json(HealthInfoResponse {
        service: "kaiwa-backend",
        version: env!("CARGO_PKG_VERSION"),
        start_time: start_time.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        uptime: state.uptime_seconds(),
    })
    .into_response()
}

async fn live(State(state): State<AppState>) -> Response {
    Json(LivenessResponse {
        status: "healthy",
        timestamp: now_iso(),
        uptime: state.uptime_seconds(),
    })
    .into_response()
}

async fn ready(State(state): State<AppState>) -> Response {
    let snapshot = state.store().health().await;
    let database = database_status(snapshot.as_ref());
    let capabilities = state.capabilities();

    let status = match database {
        "disconnected" => "unhealthy",
        "degraded" => "degraded",
        _ if !capabilities.generation => "degraded",
        _ => "healthy",
    };

    let response = ReadinessResponse {
        status,
        timestamp: now_iso(),
        uptime: state.uptime_seconds(),
        checks: ReadinessChecks {
            database,
            generation: capabilities.generation,
        },
        database_latency_ms: snapshot.and_then(|s| s.latency_ms),
    };

    let status_code = match status {
        "healthy" | "degraded" => StatusCode::OK,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(response)).into_response()
}

fn database_status(snapshot: Option<&HealthCheckSnapshot>) -> &'static str {
    match snapshot {
        None => "in-memory",
        // no check has completed yet
        Some(s) if s.timestamp_ms.is_none() => "connecting",
        Some(s) if s.healthy => "connected",
        Some(s) if s.degraded => "disconnected",
        Some(_) => "degraded",
    }
}

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
    store: &'static str,
    timestamp: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthInfoResponse {
    service: &'static str,
    version: &'static str,
    start_time: String,
    uptime: u64,
}

#[derive(Serialize)]
struct LivenessResponse {
    status: &'static str,
    timestamp: String,
    uptime: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReadinessResponse {
    status: &'static str,
    timestamp: String,
    uptime: u64,
    checks: ReadinessChecks,
    #[serde(skip_serializing_if = "Option::is_none")]
    database_latency_ms: Option<u64>,
}

#[derive(Serialize)]
struct ReadinessChecks {
    database: &'static str,
    generation: bool,
}
