//! JSON HTTP API over [`DocumentService`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/` | Service name and version |
//! | `GET`    | `/health` | Health check |
//! | `POST`   | `/documents` | Submit a PDF (base64) or pre-extracted text |
//! | `GET`    | `/documents?limit=N` | Most recent records with text previews |
//! | `GET`    | `/documents/missing-summary?limit=N` | Records without a summary |
//! | `GET`    | `/documents/{id}` | One full record |
//! | `DELETE` | `/documents/{id}` | Delete a record |
//! | `POST`   | `/documents/{id}/summary` | Regenerate a record's summary |
//! | `GET`    | `/check-duplicate/{hash}` | Whether a fingerprint is stored |
//! | `GET`    | `/stats` | Record, word and character totals |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "Record 42 not found" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//! A submission that fails during processing is not an error response: it
//! returns the usual submit body with `success: false` and status 500.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser front end
//! can be served from another origin.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::{Config, LlmOverrides};
use crate::ingest::Ingestor;
use crate::models::{DocumentRecord, StoreStats};
use crate::service::{DocumentService, ServiceError, SubmitContent, SubmitResponse, SummaryUpdate};

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 1000;

type AppState = Arc<DocumentService>;

/// Starts the HTTP server on `[server].bind` and runs until the process is
/// terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let ingestor = Ingestor::from_config(config, &LlmOverrides::default()).await?;
    let service = Arc::new(DocumentService::new(ingestor));

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, "server listening");
    println!("OCR Harness API listening on http://{}", config.server.bind);

    axum::serve(listener, router(service)).await?;
    Ok(())
}

/// Build the router. Exposed so callers can mount it with their own service.
pub fn router(service: Arc<DocumentService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/documents", post(handle_submit).get(handle_list))
        .route("/documents/missing-summary", get(handle_missing_summary))
        .route("/documents/{id}", get(handle_get).delete(handle_delete))
        .route("/documents/{id}/summary", post(handle_update_summary))
        .route("/check-duplicate/{hash}", get(handle_check_duplicate))
        .route("/stats", get(handle_stats))
        .layer(cors)
        .with_state(service)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::NotFound(message) => AppError {
                status: StatusCode::NOT_FOUND,
                code: "not_found",
                message,
            },
            ServiceError::BadRequest(message) => bad_request(message),
            ServiceError::Internal(err) => {
                tracing::error!(error = ?err, "request failed");
                AppError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "internal",
                    message: err.to_string(),
                }
            }
        }
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

// ============ GET / and /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn handle_root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "OCR Harness API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============ POST /documents ============

#[derive(Deserialize)]
struct SubmitRequest {
    filename: String,
    #[serde(default)]
    extracted_text: Option<String>,
    #[serde(default)]
    content_base64: Option<String>,
    #[serde(default)]
    generate_summary: bool,
    #[serde(default)]
    content_hash: Option<String>,
}

async fn handle_submit(
    State(service): State<AppState>,
    Json(req): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    if req.filename.trim().is_empty() {
        return Err(bad_request("filename must not be empty"));
    }

    let content = match (req.extracted_text, req.content_base64) {
        (Some(text), None) => SubmitContent::Text {
            text,
            content_hash: req.content_hash.filter(|h| !h.is_empty()),
        },
        (None, Some(encoded)) => {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(encoded.trim())
                .map_err(|e| bad_request(format!("content_base64 is not valid base64: {}", e)))?;
            SubmitContent::Pdf(bytes)
        }
        _ => {
            return Err(bad_request(
                "exactly one of extracted_text or content_base64 is required",
            ))
        }
    };

    let resp = service
        .submit(&req.filename, content, req.generate_summary)
        .await;
    let status = if resp.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(resp)))
}

// ============ GET /documents ============

#[derive(Deserialize)]
struct ListParams {
    limit: Option<i64>,
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// List entry: the record with its text cut down to a preview.
#[derive(Serialize)]
struct DocumentListItem {
    id: i64,
    filename: String,
    preview: Option<String>,
    word_count: i64,
    character_length: i64,
    summary: Option<String>,
    content_hash: Option<String>,
    created_timestamp: i64,
    created_at: String,
}

impl From<DocumentRecord> for DocumentListItem {
    fn from(r: DocumentRecord) -> Self {
        DocumentListItem {
            preview: r.preview(),
            created_at: r.created_at_iso(),
            id: r.id,
            filename: r.filename,
            word_count: r.word_count,
            character_length: r.character_length,
            summary: r.summary,
            content_hash: r.content_hash,
            created_timestamp: r.created_timestamp,
        }
    }
}

#[derive(Serialize)]
struct DocumentListResponse {
    count: usize,
    documents: Vec<DocumentListItem>,
}

impl From<Vec<DocumentRecord>> for DocumentListResponse {
    fn from(records: Vec<DocumentRecord>) -> Self {
        let documents: Vec<DocumentListItem> = records.into_iter().map(Into::into).collect();
        DocumentListResponse {
            count: documents.len(),
            documents,
        }
    }
}

async fn handle_list(
    State(service): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<DocumentListResponse>, AppError> {
    let records = service.list_recent(clamp_limit(params.limit)).await?;
    Ok(Json(records.into()))
}

async fn handle_missing_summary(
    State(service): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<DocumentListResponse>, AppError> {
    let records = service
        .list_missing_summary(clamp_limit(params.limit))
        .await?;
    Ok(Json(records.into()))
}

// ============ /documents/{id} ============

#[derive(Serialize)]
struct DocumentResponse {
    #[serde(flatten)]
    record: DocumentRecord,
    created_at: String,
}

async fn handle_get(
    State(service): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DocumentResponse>, AppError> {
    let record = service.get(id).await?;
    Ok(Json(DocumentResponse {
        created_at: record.created_at_iso(),
        record,
    }))
}

async fn handle_delete(
    State(service): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    service.delete(id).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": format!("Record {} deleted", id),
    })))
}

async fn handle_update_summary(
    State(service): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SummaryUpdate>, AppError> {
    Ok(Json(service.update_summary(id).await?))
}

// ============ GET /check-duplicate/{hash} and /stats ============

#[derive(Serialize)]
struct DuplicateResponse {
    content_hash: String,
    is_duplicate: bool,
}

async fn handle_check_duplicate(
    State(service): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<DuplicateResponse>, AppError> {
    let is_duplicate = service.check_duplicate(&hash).await?;
    Ok(Json(DuplicateResponse {
        content_hash: hash,
        is_duplicate,
    }))
}

async fn handle_stats(State(service): State<AppState>) -> Result<Json<StoreStats>, AppError> {
    Ok(Json(service.stats().await?))
}
