//! HTTP handlers

use crate::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use nifi_otel_core::events::{BulletinEvent, ProvenanceEvent};
use nifi_otel_core::metrics::BatchKind;
use nifi_otel_core::{EventTranslator, TraceBatch};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, error};

pub async fn receive_provenance(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    receive(
        &state,
        BatchKind::Provenance,
        &body,
        EventTranslator::translate_provenance,
    )
    .await
}

pub async fn receive_bulletins(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    receive(
        &state,
        BatchKind::Bulletin,
        &body,
        EventTranslator::translate_bulletins,
    )
    .await
}

/// Decode, translate under the lock, then consume with the lock released
async fn receive<E: DeserializeOwned>(
    state: &AppState,
    kind: BatchKind,
    body: &[u8],
    translate: fn(&mut EventTranslator, &[E]) -> TraceBatch,
) -> Response {
    state.metrics.record_batch(kind);

    let events: Vec<E> = match serde_json::from_slice(body) {
        Ok(events) => events,
        Err(e) => {
            state.metrics.record_decode_failure();
            error!(kind = kind.as_str(), error = %e, "Failed to decode JSON");
            return (StatusCode::BAD_REQUEST, "Failed to decode JSON").into_response();
        }
    };

    let batch = {
        let mut translator = state.translator.lock();
        let batch = translate(&mut translator, &events);
        state.metrics.set_lineage_entries(translator.lineage_len());
        batch
    };
    state.metrics.record_skipped(batch.skipped());

    let spans = batch.span_count();
    if let Err(e) = state.consumer.consume(batch).await {
        state.metrics.record_consumed(spans, false);
        error!(
            kind = kind.as_str(),
            consumer = state.consumer.name(),
            error = %e,
            "Failed to consume traces"
        );
        return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to consume traces").into_response();
    }
    state.metrics.record_consumed(spans, true);
    debug!(kind = kind.as_str(), events = events.len(), spans, "Batch consumed");

    state.sweep();
    (StatusCode::OK, "OK").into_response()
}

/// Health check endpoint for container probes
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "nifi-otel",
        "version": nifi_otel_core::RECEIVER_VERSION,
    }))
}

pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(state.metrics.to_json())
}

pub async fn get_metrics_prometheus(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.to_prometheus(),
    )
}
