//! Ingest Routes
//!
//! Endpoint producers call to hand telemetry to the hub.
//!
//! - POST /data - Single telemetry event

use axum::{body::Bytes, extract::State, Json};
use std::sync::Arc;

use crate::api::dto::IngestResponse;
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::broadcast::TelemetryEvent;

/// POST /data
///
/// Accept one telemetry event and broadcast it. Returns as soon as the event
/// is buffered for every live subscriber; delivery is not awaited. A body
/// that is not a JSON object is rejected and nothing is published.
pub async fn receive_data(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<IngestResponse>> {
    let event = TelemetryEvent::from_slice(&body)?;

    tracing::debug!(fields = event.len(), bytes = body.len(), "Received telemetry");

    let report = state.hub.publish(&event)?;

    tracing::trace!(
        delivered = report.delivered,
        evicted = report.evicted,
        "Telemetry published"
    );

    Ok(Json(IngestResponse::received()))
}
