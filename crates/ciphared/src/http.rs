//! Public HTTP API
//!
//!   GET  /                        service status
//!   GET  /health                  service status
//!   POST /api/encode              store a secret, 201 {file_id, share_link}
//!   POST /api/decode/{file_id}    read a secret, 200 {file_data, ...}
//!
//! Errors, unknown routes included, are `{"error": message}`. Storage detail
//! stays in the logs.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use ciphare_core::config::LimitsConfig;
use ciphare_core::CiphareError;
use ciphare_crypto::encoding;
use ciphare_vault::{SubmitRequest, Vault};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::metrics::{FailureReason, Metrics};

/// Generic message for every decryption failure.
const AUTH_FAILED: &str = "invalid password or corrupted data";

#[derive(Clone)]
pub struct AppState {
    pub vault: Vault,
    pub metrics: Arc<Metrics>,
}

pub fn router(state: AppState, limits: &LimitsConfig) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/health", get(status))
        .route("/api/encode", post(encode_handler))
        .route("/api/decode/{file_id}", post(decode_handler))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit(limits)))
        .with_state(state)
}

/// Request bodies carry the payload as base64 inside JSON.
pub fn body_limit(limits: &LimitsConfig) -> usize {
    let encoded = limits.max_payload_bytes.saturating_add(2) / 3 * 4;
    usize::try_from(encoded.saturating_add(64 * 1024)).unwrap_or(usize::MAX)
}

#[derive(Debug, Deserialize)]
pub struct EncodeRequest {
    pub file_data: Option<String>,
    pub password: Option<String>,
    pub algorithm: Option<String>,
    pub ttl: Option<i64>,
    pub reads: Option<i64>,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EncodeResponse {
    pub file_id: String,
    pub share_link: String,
}

#[derive(Debug, Deserialize)]
pub struct DecodeRequest {
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DecodeResponse {
    pub file_data: String,
    pub file_name: String,
    pub file_type: String,
    pub remaining_reads: u32,
}

/// Maps the core taxonomy onto status codes.
#[derive(Debug)]
pub enum ApiError {
    Core(CiphareError),
    /// Body could not be extracted (bad JSON, too large).
    Rejected { status: StatusCode, message: String },
}

impl ApiError {
    pub fn reason(&self) -> FailureReason {
        match self {
            ApiError::Core(e) => e.into(),
            ApiError::Rejected { .. } => FailureReason::Validation,
        }
    }
}

impl From<CiphareError> for ApiError {
    fn from(e: CiphareError) -> Self {
        ApiError::Core(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Rejected { status, message } => (status, message),
            ApiError::Core(CiphareError::Validation(msg)) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Core(e @ CiphareError::UnsupportedAlgorithm { .. }) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            ApiError::Core(e @ CiphareError::NotFound) => (StatusCode::NOT_FOUND, e.to_string()),
            ApiError::Core(CiphareError::Authentication) => {
                (StatusCode::BAD_REQUEST, AUTH_FAILED.to_string())
            }
            ApiError::Core(CiphareError::MalformedMetadata(detail)) => {
                tracing::error!("stored artifact metadata is malformed: {detail}");
                (StatusCode::BAD_REQUEST, AUTH_FAILED.to_string())
            }
            ApiError::Core(e) if e.is_retryable() => {
                tracing::warn!("storage unavailable: {e}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "storage temporarily unavailable, retry later".to_string(),
                )
            }
            ApiError::Core(e) => {
                tracing::error!("request failed: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError::Core(CiphareError::Validation(message.into()))
}

async fn status() -> impl IntoResponse {
    Json(json!({ "status": "running", "service": "ciphare" }))
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

async fn encode_handler(
    State(state): State<AppState>,
    body: Result<Json<EncodeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let result = encode(&state, body).await;
    match &result {
        Ok(_) => {
            state.metrics.submitted.inc();
        }
        Err(e) => state.metrics.submit_failed(e.reason()),
    };
    result.map(|resp| (StatusCode::CREATED, Json(resp)))
}

async fn encode(
    state: &AppState,
    body: Result<Json<EncodeRequest>, JsonRejection>,
) -> Result<EncodeResponse, ApiError> {
    let Json(req) = body?;

    let (Some(file_data), Some(password)) = (req.file_data, req.password) else {
        return Err(bad_request("file_data and password are required"));
    };
    let plaintext = encoding::decode(&file_data)
        .map_err(|_| bad_request("file_data is not valid base64"))?;

    let mut submit = SubmitRequest::new(plaintext, password);
    submit.ttl_secs = req.ttl;
    submit.max_reads = req.reads;
    submit.file_name = req.file_name;
    submit.file_type = req.file_type;
    submit.algorithm = req.algorithm;

    let receipt = state.vault.submit(submit).await?;
    Ok(EncodeResponse {
        file_id: receipt.id.to_string(),
        share_link: receipt.share_link,
    })
}

async fn decode_handler(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    body: Result<Json<DecodeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let result = decode(&state, &file_id, body).await;
    match &result {
        Ok(_) => {
            state.metrics.retrieved.inc();
        }
        Err(e) => state.metrics.retrieve_failed(e.reason()),
    };
    result.map(Json)
}

async fn decode(
    state: &AppState,
    file_id: &str,
    body: Result<Json<DecodeRequest>, JsonRejection>,
) -> Result<DecodeResponse, ApiError> {
    let Json(req) = body?;
    let password = req
        .password
        .ok_or_else(|| bad_request("password is required"))?;

    let retrieved = state
        .vault
        .retrieve(file_id, SecretString::from(password))
        .await?;

    Ok(DecodeResponse {
        file_data: encoding::encode(&retrieved.plaintext),
        file_name: retrieved.file_name,
        file_type: retrieved.file_type,
        remaining_reads: retrieved.remaining_reads,
    })
}
