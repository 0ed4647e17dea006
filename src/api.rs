use crate::engine::{Engine, EngineStats};
use crate::indexer::IndexReport;
use crate::model::DocumentResult;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// ========== Request/Response Types ==========

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct SearchApiResponse {
    /// Canonical form of the query as evaluated.
    pub query: String,
    pub from_cache: bool,
    pub total: usize,
    pub results: Vec<ResultEntry>,
}

#[derive(Debug, Serialize)]
pub struct ResultEntry {
    pub filename: String,
    /// Unix timestamp of the file's last modification.
    pub date: i64,
    pub rank: f64,
}

impl From<DocumentResult> for ResultEntry {
    fn from(result: DocumentResult) -> Self {
        Self {
            filename: result.filename,
            date: result.date,
            rank: result.rank,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IndexRequest {
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct IndexApiResponse {
    pub indexed: usize,
    pub skipped: usize,
    pub deleted: usize,
    pub failed: usize,
}

impl From<IndexReport> for IndexApiResponse {
    fn from(report: IndexReport) -> Self {
        Self {
            indexed: report.indexed,
            skipped: report.skipped,
            deleted: report.deleted,
            failed: report.failed,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    fn error(message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            message: Some(message),
        }
    }
}

// ========== Error Handling ==========

struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = format!("{:#}", self.0);
        tracing::error!("API error: {}", message);

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<()>::error(message)),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

// ========== Handlers ==========

async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::success("OK"))
}

async fn search(
    State(engine): State<Arc<Engine>>,
    Query(req): Query<SearchRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = engine.search(&req.q)?;

    Ok(Json(ApiResponse::success(SearchApiResponse {
        query: response.query,
        from_cache: response.from_cache,
        total: response.results.len(),
        results: response.results.into_iter().map(ResultEntry::from).collect(),
    })))
}

async fn index_path(
    State(engine): State<Arc<Engine>>,
    Json(req): Json<IndexRequest>,
) -> Result<impl IntoResponse, AppError> {
    let report = engine.index_path(&req.path)?;
    Ok(Json(ApiResponse::success(IndexApiResponse::from(report))))
}

async fn get_stats(State(engine): State<Arc<Engine>>) -> Result<impl IntoResponse, AppError> {
    let stats: EngineStats = engine.stats()?;
    Ok(Json(ApiResponse::success(stats)))
}

// ========== Router ==========

pub fn create_router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/search", get(search))
        .route("/index", post(index_path))
        .route("/stats", get(get_stats))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(engine)
}
