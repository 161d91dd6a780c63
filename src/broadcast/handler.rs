//! Event Stream Handler
//!
//! Opens a subscription for each `GET /events` request and streams its
//! frames back as `text/event-stream`.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderName},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::api::{ApiResult, AppState};

/// GET /events
///
/// Server-Sent Events stream of published telemetry. The subscription lives
/// as long as the response body; when the viewer disconnects the body is
/// dropped and the subscription leaves the hub.
pub async fn events_handler(State(state): State<Arc<AppState>>) -> ApiResult<Response> {
    let subscription = state.hub.subscribe()?;

    tracing::debug!(subscription_id = %subscription.id(), "Opening event stream");

    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
            // Keeps nginx-style reverse proxies from buffering the stream
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Body::from_stream(subscription.into_stream()),
    )
        .into_response())
}
