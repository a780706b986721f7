//! HTTP server for indexing and label-filtered search.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/index` | Index one document under a given cluster label (default `root`) |
//! | `POST` | `/bulk_index` | Partition a batch, index it, return the label mapping |
//! | `GET`  | `/search` | `?query=..&cluster=..&limit=..` full-text search |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query parameter is required" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use fractal_search_core::document::{Document, DocumentInput};
use fractal_search_core::error::Error as CoreError;
use fractal_search_core::partition::{LabelMapping, Partitioner, ROOT_LABEL};
use fractal_search_core::pipeline::label_and_index;
use fractal_search_core::search::{search, SearchRequest};
use fractal_search_core::store::{IndexSchema, LabeledDocument, SearchBackend};

use crate::config::Config;
use crate::db;
use crate::sqlite_backend::SqliteBackend;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    schema: Arc<IndexSchema>,
    backend: Arc<dyn SearchBackend>,
}

impl AppState {
    pub fn new(config: Config, backend: Arc<dyn SearchBackend>) -> Self {
        let schema = Arc::new(config.schema());
        Self {
            config: Arc::new(config),
            schema,
            backend,
        }
    }
}

/// Build the router over any backend.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/index", post(handle_index))
        .route("/bulk_index", post(handle_bulk_index))
        .route("/search", get(handle_search))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind` with the SQLite backend.
///
/// Creates the index on startup if it does not exist yet.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let pool = db::connect(config).await?;
    let schema = config.schema();
    let backend = SqliteBackend::new(pool, &schema)?;
    backend.ensure_index(&schema).await?;

    let app = router(AppState::new(config.clone(), Arc::new(backend)));

    info!(bind = %bind_addr, index = %schema.name, "server listening");
    println!("Fractal Search server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
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

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Map core error variants to 4xx; everything else is a 500.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<CoreError>() {
            Some(CoreError::InvalidInput(_)) => bad_request(err.to_string()),
            Some(CoreError::IndexMissing(_)) => not_found(err.to_string()),
            None => {
                error!(error = %format!("{:#}", err), "request failed");
                internal(err.to_string())
            }
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        anyhow::Error::from(err).into()
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /index ============

#[derive(Deserialize)]
struct IndexRequest {
    #[serde(alias = "id")]
    doc_id: Option<String>,
    text: Option<String>,
    cluster: Option<String>,
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

/// Index a single document under the caller's label, no partitioning.
async fn handle_index(
    State(state): State<AppState>,
    Json(req): Json<IndexRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let (doc_id, text) = match (req.doc_id, req.text) {
        (Some(id), Some(text)) if !id.trim().is_empty() && !text.trim().is_empty() => (id, text),
        _ => return Err(bad_request("doc_id and text are required")),
    };

    let doc = Document::new(doc_id, text)?;
    let labeled = LabeledDocument {
        id: doc.id().to_string(),
        text: doc.text().to_string(),
        label: req.cluster.unwrap_or_else(|| ROOT_LABEL.to_string()),
    };

    state.backend.ensure_index(&state.schema).await?;
    state
        .backend
        .upsert_documents(std::slice::from_ref(&labeled))
        .await?;
    state.backend.refresh().await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Document indexed successfully.".to_string(),
        }),
    ))
}

// ============ POST /bulk_index ============

#[derive(Serialize)]
struct BulkIndexResponse {
    message: String,
    labels: LabelMapping,
}

/// Partition the submitted batch and index it with the computed labels.
async fn handle_bulk_index(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<BulkIndexResponse>), AppError> {
    if !body.is_array() {
        return Err(bad_request("Expected a list of documents."));
    }
    let inputs: Vec<DocumentInput> =
        serde_json::from_value(body).map_err(|e| bad_request(e.to_string()))?;
    let documents = inputs
        .into_iter()
        .map(Document::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    let partitioner = Partitioner::new(state.config.partition.max_documents);
    let labels = label_and_index(
        state.backend.as_ref(),
        &state.schema,
        &partitioner,
        &documents,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(BulkIndexResponse {
            message: "Documents indexed successfully.".to_string(),
            labels,
        }),
    ))
}

// ============ GET /search ============

#[derive(Deserialize)]
struct SearchParams {
    query: Option<String>,
    cluster: Option<String>,
    limit: Option<usize>,
}

#[derive(Serialize)]
struct SearchResultBody {
    doc_id: String,
    text: String,
    cluster: String,
    score: f64,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchResultBody>,
}

async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    let query = match params.query.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => q,
        _ => return Err(bad_request("Query parameter is required.")),
    };

    let req = SearchRequest {
        query,
        label_filter: params.cluster.as_deref().filter(|c| !c.is_empty()),
        limit: params.limit.unwrap_or(state.config.search.default_limit),
    };
    let results = search(state.backend.as_ref(), &req).await?;

    Ok(Json(SearchResponse {
        results: results
            .into_iter()
            .map(|r| SearchResultBody {
                doc_id: r.id,
                text: r.text,
                cluster: r.label,
                score: r.raw_score,
            })
            .collect(),
    }))
}
