use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::core::ViewRecord;
use crate::error::{ErrorKind, RetrievalError};
use crate::pipeline::Pipeline;
use crate::query::Page;
use crate::stats::StatsReport;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedParams {
    pub search_term: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: &'static str,
}

/// 把流水线错误映射为 HTTP 响应
#[derive(Debug)]
pub struct ApiError(pub RetrievalError);

impl From<RetrievalError> for ApiError {
    fn from(e: RetrievalError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::Transport | ErrorKind::Decode => StatusCode::BAD_GATEWAY,
            ErrorKind::EmptyResult => StatusCode::NOT_FOUND,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.0.to_string(),
            kind: self.0.kind().as_str(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// HTTP 查询服务
pub struct QueryServer {
    pub pipeline: Arc<Pipeline>,
}

impl QueryServer {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/items/new", get(new_items_handler))
            .route("/api/items/new/paginated", get(paginated_handler))
            .route("/api/items/refresh", post(refresh_handler))
            .route("/status", get(status_handler))
            // 浏览器前端跨域调用：允许任意来源
            .layer(CorsLayer::permissive())
            .with_state(self.pipeline.clone())
    }

    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("HTTP Query Server listening on {}", listener.local_addr()?);
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await?;
        Ok(())
    }
}

pub async fn new_items_handler(
    State(pipeline): State<Arc<Pipeline>>,
) -> Result<Json<Vec<ViewRecord>>, ApiError> {
    let view = pipeline.get_view().await?;
    Ok(Json(view.as_ref().clone()))
}

pub async fn paginated_handler(
    State(pipeline): State<Arc<Pipeline>>,
    Query(params): Query<PaginatedParams>,
) -> Result<Json<Page<ViewRecord>>, ApiError> {
    let floor = pipeline.options().page_size as i64;
    let page = pipeline
        .query(
            params.search_term.as_deref(),
            params.page.unwrap_or(1),
            params.page_size.unwrap_or(floor),
        )
        .await?;
    Ok(Json(page))
}

pub async fn refresh_handler(
    State(pipeline): State<Arc<Pipeline>>,
) -> Result<Json<StatsReport>, ApiError> {
    pipeline.refresh().await?;
    Ok(Json(pipeline.stats()))
}

pub async fn status_handler(State(pipeline): State<Arc<Pipeline>>) -> Json<StatsReport> {
    Json(pipeline.stats())
}
