use crate::app::files_use_case::FilesUseCase;
use crate::constants::*;
use crate::error::FilesError;
use crate::observability::metrics;
use axum::{
    extract::{Query, State},
    http::{header::CONTENT_TYPE, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use hyper::Server;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub files: Arc<FilesUseCase>,
}

/// Query string of `GET /files/data`. Values stay raw so malformed numbers
/// fall back to defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuery {
    pub file_name: Option<String>,
    pub include_empty: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub file_name: Option<String>,
}

/// Fixed error body shared by every endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEnvelope {
    pub code: &'static str,
    pub message: &'static str,
    pub details: Option<String>,
    pub status: u16,
}

impl ErrorEnvelope {
    pub fn new(status: StatusCode, message: &'static str, details: Option<String>) -> Self {
        Self {
            code: ERROR_CODE,
            message,
            details,
            status: status.as_u16(),
        }
    }
}

impl IntoResponse for ErrorEnvelope {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "csv-files-api",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn metrics_text() -> Response {
    match metrics::render() {
        Some(body) => ([(CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response(),
        None => ErrorEnvelope::new(
            StatusCode::SERVICE_UNAVAILABLE,
            MSG_UNAVAILABLE,
            Some("metrics recorder not installed".to_string()),
        )
        .into_response(),
    }
}

async fn files_data(State(state): State<AppState>, Query(query): Query<DataQuery>) -> Response {
    let file_name = query.file_name.as_deref().filter(|n| !n.is_empty());
    let include_empty = query.include_empty.as_deref() == Some("true");

    let data = match state.files.aggregate(file_name, include_empty).await {
        Ok(data) => data,
        Err(e) => {
            error!("Error in /files/data: {}", e);
            return ErrorEnvelope::new(StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL, Some(e.to_string()))
                .into_response();
        }
    };

    // Aggregation trusts the name, so an unknown file surfaces here as an empty strict result
    if file_name.is_some() && !include_empty && data.is_empty() {
        return ErrorEnvelope::new(StatusCode::NOT_FOUND, MSG_NOT_FOUND, None).into_response();
    }

    let data = match file_name {
        Some(_) => data,
        None => paginate(data, query.limit.as_deref(), query.offset.as_deref()),
    };
    Json(data).into_response()
}

async fn files_list(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Response {
    let file_name = query.file_name.as_deref().filter(|n| !n.is_empty());
    match state.files.resolve_file_list(file_name).await {
        Ok(list) => Json(list).into_response(),
        Err(FilesError::NotFound(_)) => ErrorEnvelope::new(
            StatusCode::NOT_FOUND,
            MSG_NOT_FOUND,
            Some(DETAIL_FILE_NOT_FOUND.to_string()),
        )
        .into_response(),
        Err(e) => {
            error!("Error in /files/list: {}", e);
            ErrorEnvelope::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                MSG_LIST_FAILED,
                Some(DETAIL_LIST_FAILED.to_string()),
            )
            .into_response()
        }
    }
}

/// `items[offset .. offset + limit]`. A missing, invalid or zero limit means
/// no limit; a missing or invalid offset means zero.
pub fn paginate<T>(items: Vec<T>, limit: Option<&str>, offset: Option<&str>) -> Vec<T> {
    let limit = limit.and_then(parse_count).filter(|l| *l > 0).unwrap_or(items.len());
    let offset = offset.and_then(parse_count).unwrap_or(0);
    items.into_iter().skip(offset).take(limit).collect()
}

/// Integer prefix of `raw` after leading whitespace and an optional sign, so
/// `"2.5"` reads as 2 and `"3abc"` as 3. Negative counts are rejected.
fn parse_count(raw: &str) -> Option<usize> {
    let trimmed = raw.trim_start();
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    let digits = &unsigned[..end];
    if digits.is_empty() {
        return None;
    }
    if negative {
        // "-0" is still zero
        return digits.bytes().all(|b| b == b'0').then_some(0);
    }
    // Saturate oversized counts instead of dropping them
    Some(digits.parse::<usize>().unwrap_or(usize::MAX))
}

/// Create the HTTP router with all routes
pub fn create_server(files: Arc<FilesUseCase>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_text))
        .route("/files/data", get(files_data))
        .route("/files/list", get(files_list))
        .with_state(AppState { files })
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

/// Start the HTTP server on the specified port and run until Ctrl-C.
pub async fn start_server(files: Arc<FilesUseCase>, port: u16) -> anyhow::Result<()> {
    let app = create_server(files);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("HTTP server running on http://localhost:{port}");
    info!("Files data:   http://localhost:{port}/files/data");
    info!("Files list:   http://localhost:{port}/files/list");

    Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
