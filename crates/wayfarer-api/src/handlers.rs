//! Route handler functions for all API endpoints.
//!
//! Each handler extracts its JSON body or path/query parameters, calls into
//! the services held by [`AppState`], and returns a JSON response.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use wayfarer_core::{ContextChunk, MessageRequest, TurnResult};
use wayfarer_vector::{DocumentInfo, IngestRequest, SearchOptions};

use crate::error::ApiError;
use crate::state::AppState;

/// Upper bound on `topK` for document queries.
const MAX_QUERY_TOP_K: usize = 50;

// =============================================================================
// Request types
// =============================================================================

/// Body of `POST /api/documents/query`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentQueryRequest {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub min_score: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub category: Option<String>,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub success: bool,
    pub document_id: String,
    pub filename: String,
    pub chunks: usize,
    pub characters: usize,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentQueryResponse {
    pub success: bool,
    pub query: String,
    pub results: Vec<ContextChunk>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
    pub document_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub indexed_chunks: usize,
    pub documents: usize,
    pub model: String,
}

/// Unwrap a JSON body, reporting rejections in the API's error shape.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

// =============================================================================
// Conversation
// =============================================================================

/// POST /api/ai/message - run one planning turn.
///
/// Model and output failures are not errors here: they come back as a
/// `loading` turn. Only bad input yields a 4xx.
pub async fn message(
    State(state): State<AppState>,
    body: Result<Json<MessageRequest>, JsonRejection>,
) -> Result<Json<TurnResult>, ApiError> {
    let request = json_body(body)?;
    let history = request.conversation_history();
    let result = state
        .orchestrator
        .handle_turn(&request.message, &history)
        .await?;
    Ok(Json(result))
}

// =============================================================================
// Documents
// =============================================================================

/// POST /api/documents - chunk, embed and index extracted document text.
pub async fn ingest_document(
    State(state): State<AppState>,
    body: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<Json<IngestResponse>, ApiError> {
    let request = json_body(body)?;
    let report = state.pipeline.ingest(request).await?;
    info!(
        document_id = %report.document_id,
        chunks = report.chunks,
        "Document ingested via API"
    );

    Ok(Json(IngestResponse {
        success: true,
        message: format!(
            "Processed {} into {} chunks",
            report.filename, report.chunks
        ),
        document_id: report.document_id,
        filename: report.filename,
        chunks: report.chunks,
        characters: report.characters,
    }))
}

/// POST /api/documents/query - semantic search over indexed documents.
pub async fn query_documents(
    State(state): State<AppState>,
    body: Result<Json<DocumentQueryRequest>, JsonRejection>,
) -> Result<Json<DocumentQueryResponse>, ApiError> {
    let request = json_body(body)?;
    let query = request.query.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("Query text is required".to_string()));
    }

    let defaults = SearchOptions::default();
    let options = SearchOptions {
        top_k: request
            .top_k
            .unwrap_or(state.config.retrieval.query_top_k)
            .clamp(1, MAX_QUERY_TOP_K),
        min_score: request.min_score.unwrap_or(defaults.min_score),
        category: request.category.filter(|c| !c.trim().is_empty()),
    };

    let results = state.search_engine.search(query, &options).await?;
    Ok(Json(DocumentQueryResponse {
        success: true,
        query: query.to_string(),
        count: results.len(),
        results,
    }))
}

/// GET /api/documents - list ingested documents, newest first.
pub async fn list_documents(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<DocumentListResponse>, ApiError> {
    let documents = state.pipeline.list_documents(params.category.as_deref())?;
    Ok(Json(DocumentListResponse { documents }))
}

/// DELETE /api/documents/{id} - remove a document and all its chunks.
pub async fn delete_document(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let removed = state.pipeline.delete(&document_id)?;
    Ok(Json(DeleteResponse {
        success: true,
        message: format!("Deleted {} chunks", removed),
        document_id,
    }))
}

// =============================================================================
// Health
// =============================================================================

/// GET /health - liveness and index size.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        indexed_chunks: state.search_engine.indexed_chunks(),
        documents: state.pipeline.document_count(),
        model: state.orchestrator.model_name().to_string(),
    })
}
