//! Prometheus /metrics + health check HTTP endpoints
//!
//! Endpoints:
//!   GET /metrics  Prometheus text format
//!   GET /healthz  Liveness probe (always 200 if process is running)
//!   GET /readyz   Readiness probe (200 if the blob store is reachable)

use std::sync::Arc;

use anyhow::Result;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use ciphare_core::CiphareError;
use ciphare_storage::BlobStore;
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue};
use prometheus_client::metrics::{counter::Counter, family::Family};
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum FailureReason {
    NotFound,
    Authentication,
    Malformed,
    Validation,
    Storage,
    Internal,
}

impl From<&CiphareError> for FailureReason {
    fn from(e: &CiphareError) -> Self {
        match e {
            CiphareError::NotFound => FailureReason::NotFound,
            CiphareError::Authentication => FailureReason::Authentication,
            CiphareError::MalformedMetadata(_) => FailureReason::Malformed,
            CiphareError::Validation(_) | CiphareError::UnsupportedAlgorithm { .. } => {
                FailureReason::Validation
            }
            CiphareError::Storage { .. } => FailureReason::Storage,
            _ => FailureReason::Internal,
        }
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct FailureLabels {
    pub reason: FailureReason,
}

/// Service counters. Clones share the underlying values.
#[derive(Clone, Default)]
pub struct Metrics {
    pub submitted: Counter,
    pub submit_failures: Family<FailureLabels, Counter>,
    pub retrieved: Counter,
    pub retrieve_failures: Family<FailureLabels, Counter>,
    pub swept: Counter,
}

impl Metrics {
    pub fn new(registry: &mut Registry) -> Self {
        let metrics = Metrics::default();
        registry.register(
            "ciphare_artifacts_submitted",
            "Artifacts encrypted and stored",
            metrics.submitted.clone(),
        );
        registry.register(
            "ciphare_submit_failures",
            "Rejected or failed submissions by reason",
            metrics.submit_failures.clone(),
        );
        registry.register(
            "ciphare_artifacts_retrieved",
            "Successful decryptions (one per consumed read)",
            metrics.retrieved.clone(),
        );
        registry.register(
            "ciphare_retrieve_failures",
            "Failed retrievals by reason",
            metrics.retrieve_failures.clone(),
        );
        registry.register(
            "ciphare_artifacts_swept",
            "Expired artifacts destroyed by the background sweeper",
            metrics.swept.clone(),
        );
        metrics
    }

    pub fn submit_failed(&self, reason: FailureReason) {
        self.submit_failures
            .get_or_create(&FailureLabels { reason })
            .inc();
    }

    pub fn retrieve_failed(&self, reason: FailureReason) {
        self.retrieve_failures
            .get_or_create(&FailureLabels { reason })
            .inc();
    }
}

/// Shared health state updated by the daemon
#[derive(Clone)]
pub struct HealthState {
    pub registry: Arc<Registry>,
    pub blobs: Arc<dyn BlobStore>,
}

pub fn router(state: HealthState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .with_state(state)
}

/// Serve Prometheus metrics and health endpoints on `addr` (e.g. "127.0.0.1:9100")
pub async fn serve(addr: String, state: HealthState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("metrics bind {addr}: {e}"))?;

    tracing::info!(addr = %addr, "metrics: listening on /metrics, /healthz, /readyz");

    axum::serve(listener, router(state))
        .await
        .map_err(|e| anyhow::anyhow!("metrics server: {e}"))
}

async fn metrics_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let mut body = String::new();
    match encode(&mut body, &state.registry) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            body,
        ),
        Err(e) => {
            tracing::error!("metrics encode failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                e.to_string(),
            )
        }
    }
}

/// Liveness probe: returns 200 if the process is running.
async fn healthz_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Readiness probe: returns 200 if the blob store is reachable, 503 otherwise.
async fn readyz_handler(State(state): State<HealthState>) -> impl IntoResponse {
    match state.blobs.check_health().await {
        Ok(()) => (StatusCode::OK, "ready"),
        Err(e) => {
            tracing::warn!("readiness check failed: {e}");
            (StatusCode::SERVICE_UNAVAILABLE, "storage unreachable")
        }
    }
}
