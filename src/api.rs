//! HTTP surface for the controller.
//!
//! A thin axum layer over the [`Coordinator`]: the detector posts events to
//! `/detect`, sidecars pull compiled snapshots (JSON for humans, the binary
//! lookup table on `/wire`), and operators drive transduction and store
//! export/reload. All policy logic lives below; handlers only translate
//! between HTTP and `PolicyError`.

use crate::coordinator::{Coordinator, Decision};
use crate::event::{Event, Features};
use crate::policy::{encode_snapshot, PolicyError};

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use std::sync::Arc;

/// Build the controller router.
pub fn router(coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/detect", post(detect))
        .route("/snapshot/{service_id}", get(snapshot_json))
        .route("/snapshot/{service_id}/wire", get(snapshot_wire))
        .route("/export/{service_id}", get(export_store))
        .route("/reload/{service_id}", post(reload_store))
        .route("/transduce", post(transduce))
        .with_state(coordinator)
}

fn not_found(error: PolicyError) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": error.to_string()})),
    )
        .into_response()
}

fn internal_error(error: PolicyError) -> axum::response::Response {
    tracing::error!(%error, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": error.to_string()})),
    )
        .into_response()
}

fn published_version(coordinator: &Coordinator, service_id: &str) -> u64 {
    coordinator
        .snapshot(service_id)
        .map(|snapshot| snapshot.version())
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

async fn health(State(coordinator): State<Arc<Coordinator>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "services": coordinator.services().len(),
    }))
}

// ---------------------------------------------------------------------------
// POST /detect
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct DetectRequest {
    service_id: String,
    path: String,
    #[serde(default)]
    payload: String,
    features: Features,
}

#[derive(Debug, Serialize)]
pub(crate) struct DetectResponse {
    decision: Decision,
    snapshot_version: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn detect(
    State(coordinator): State<Arc<Coordinator>>,
    Json(request): Json<DetectRequest>,
) -> impl IntoResponse {
    let event = Event {
        service_id: request.service_id.clone(),
        path: request.path,
        payload: request.payload,
        features: request.features,
        label: None,
    };

    match coordinator.on_detect(&event) {
        Ok(outcome) => Json(DetectResponse {
            decision: outcome.decision,
            snapshot_version: outcome.snapshot_version,
            error: None,
        })
        .into_response(),
        Err(error @ PolicyError::InvalidPath(_)) => {
            // Enforcement fails closed: a malformed path is a definitive
            // block, with the reason documented in the response.
            tracing::warn!(%error, service = %request.service_id, "malformed path in detect");
            Json(DetectResponse {
                decision: Decision::Block,
                snapshot_version: published_version(&coordinator, &request.service_id),
                error: Some(error.to_string()),
            })
            .into_response()
        }
        Err(error) => {
            tracing::error!(%error, service = %request.service_id, "detect failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(DetectResponse {
                    decision: Decision::Block,
                    snapshot_version: published_version(&coordinator, &request.service_id),
                    error: Some(error.to_string()),
                }),
            )
                .into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// GET /snapshot/{service_id}
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(crate) struct SnapshotResponse {
    service_id: String,
    version: u64,
    paths: Vec<String>,
}

async fn snapshot_json(
    State(coordinator): State<Arc<Coordinator>>,
    Path(service_id): Path<String>,
) -> impl IntoResponse {
    match coordinator.snapshot(&service_id) {
        Ok(snapshot) => Json(SnapshotResponse {
            service_id,
            version: snapshot.version(),
            paths: snapshot
                .sorted_paths()
                .into_iter()
                .map(str::to_owned)
                .collect(),
        })
        .into_response(),
        Err(error) => not_found(error),
    }
}

// ---------------------------------------------------------------------------
// GET /snapshot/{service_id}/wire
// ---------------------------------------------------------------------------

async fn snapshot_wire(
    State(coordinator): State<Arc<Coordinator>>,
    Path(service_id): Path<String>,
) -> impl IntoResponse {
    match coordinator.snapshot(&service_id) {
        Ok(snapshot) => (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            encode_snapshot(&snapshot),
        )
            .into_response(),
        Err(error) => not_found(error),
    }
}

// ---------------------------------------------------------------------------
// GET /export/{service_id}  /  POST /reload/{service_id}
// ---------------------------------------------------------------------------

async fn export_store(
    State(coordinator): State<Arc<Coordinator>>,
    Path(service_id): Path<String>,
) -> impl IntoResponse {
    match coordinator.export(&service_id) {
        Ok(bytes) => (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            bytes,
        )
            .into_response(),
        Err(error) => not_found(error),
    }
}

async fn reload_store(
    State(coordinator): State<Arc<Coordinator>>,
    Path(service_id): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    match coordinator.reload(&service_id, &body) {
        Ok(version) => Json(serde_json::json!({
            "service_id": service_id,
            "snapshot_version": version,
        }))
        .into_response(),
        Err(error @ PolicyError::Serialization(_)) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": error.to_string()})),
        )
            .into_response(),
        Err(error) => internal_error(error),
    }
}

// ---------------------------------------------------------------------------
// POST /transduce
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct TransduceRequest {
    source_service: String,
    target_service: String,
    /// Restrict the copied suppressions to paths under this prefix; absent
    /// means copy everything.
    #[serde(default)]
    path_prefix: Option<String>,
}

async fn transduce(
    State(coordinator): State<Arc<Coordinator>>,
    Json(request): Json<TransduceRequest>,
) -> impl IntoResponse {
    let prefix = request.path_prefix;
    let result = coordinator.transduce(
        &request.source_service,
        &request.target_service,
        |path| prefix.as_deref().map_or(true, |p| path.starts_with(p)),
    );
    match result {
        Ok(version) => Json(serde_json::json!({
            "source_service": request.source_service,
            "target_service": request.target_service,
            "snapshot_version": version,
        }))
        .into_response(),
        Err(error @ PolicyError::UnknownService(_)) => not_found(error),
        Err(error) => internal_error(error),
    }
}
