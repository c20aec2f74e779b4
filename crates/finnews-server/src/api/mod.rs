mod alerts;
mod jobs;
mod pipeline;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use finnews_pipeline::{NewsService, PipelineError, QueryError};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{enforce_rate_limit, request_id, RateLimitState, RequestId};
use crate::scheduler::IngestScheduler;

const DEFAULT_REQUESTS_PER_MINUTE: usize = 120;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub service: Arc<NewsService>,
    pub scheduler: Arc<IngestScheduler>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(data: T, request_id: String) -> Self {
        Self {
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
                details: None,
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_unavailable" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_pipeline_error(request_id: String, error: &PipelineError) -> ApiError {
    match error {
        PipelineError::RunInProgress => ApiError::new(request_id, "conflict", error.to_string()),
        PipelineError::StageFailed { stats, .. } => {
            tracing::error!(error = %error, "pipeline run failed");
            let api_error = ApiError::new(request_id, "pipeline_failed", error.to_string());
            match serde_json::to_value(stats) {
                Ok(partial) => {
                    api_error.with_details(serde_json::json!({ "partial_stats": partial }))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "could not serialize partial run stats");
                    api_error
                }
            }
        }
        PipelineError::Store(e) => {
            tracing::error!(error = %e, "pipeline store lookup failed");
            ApiError::new(request_id, "internal_error", "article store unavailable")
        }
    }
}

pub(super) fn map_query_error(request_id: String, error: &QueryError) -> ApiError {
    match error {
        QueryError::EmptyQuery | QueryError::InvalidTopK { .. } => {
            ApiError::new(request_id, "validation_error", error.to_string())
        }
        QueryError::Scoring(e) => {
            tracing::error!(error = %e, "query scoring failed");
            ApiError::new(request_id, "upstream_unavailable", e.to_string())
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
}

fn control_router(rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/pipeline/run", post(pipeline::run_pipeline))
        .route("/api/v1/pipeline/last-run", get(pipeline::last_run))
        .route("/api/v1/query", post(pipeline::query))
        .route("/api/v1/llm/health", get(pipeline::llm_health))
        .route("/api/v1/scheduler/start", post(jobs::start))
        .route("/api/v1/scheduler/stop", post(jobs::stop))
        .route("/api/v1/scheduler/status", get(jobs::status))
        .route("/api/v1/scheduler/run-now", post(jobs::run_now))
        .route("/api/v1/alerts/stream", get(alerts::stream_alerts))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(control_router(rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match finnews_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::per_minute(DEFAULT_REQUESTS_PER_MINUTE)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_support::{article, test_service};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    async fn app_with_pool(pool: PgPool) -> (Router, Arc<NewsService>) {
        let service = test_service(0);
        let scheduler = Arc::new(
            IngestScheduler::new(Arc::clone(&service), Duration::from_secs(60))
                .await
                .unwrap(),
        );
        let state = AppState {
            pool,
            service: Arc::clone(&service),
            scheduler,
        };
        (build_app(state, default_rate_limit_state()), service)
    }

    async fn test_app() -> (Router, Arc<NewsService>) {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/finnews_test")
            .unwrap();
        app_with_pool(pool).await
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let request = builder
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[test]
    fn api_error_codes_map_to_status() {
        let cases = [
            ("validation_error", StatusCode::BAD_REQUEST),
            ("conflict", StatusCode::CONFLICT),
            ("upstream_unavailable", StatusCode::BAD_GATEWAY),
            ("pipeline_failed", StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (code, expected) in cases {
            let response = ApiError::new("req-1", code, "x").into_response();
            assert_eq!(response.status(), expected, "code {code}");
        }
    }

    #[test]
    fn run_in_progress_maps_to_conflict() {
        let err = map_pipeline_error("req-1".to_string(), &PipelineError::RunInProgress);
        assert_eq!(err.error.code, "conflict");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn health_reports_database_ok(pool: PgPool) {
        let (app, _) = app_with_pool(pool).await;
        let (status, json) = send(&app, "GET", "/api/v1/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "ok");
        assert_eq!(json["data"]["database"], "ok");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn request_id_header_is_echoed() {
        let (app, _) = test_app().await;
        let request = Request::builder()
            .uri("/api/v1/llm/health")
            .header("x-request-id", "abc-123")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.headers()["x-request-id"], "abc-123");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn pipeline_run_then_last_run() {
        let (app, _) = test_app().await;

        let (status, json) = send(&app, "GET", "/api/v1/pipeline/last-run", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["data"].is_null());

        let (status, json) = send(&app, "POST", "/api/v1/pipeline/run?limit=5", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["new"], 0);
        assert_eq!(json["data"]["last_stage"], "DONE");

        let (_, json) = send(&app, "GET", "/api/v1/pipeline/last-run", None).await;
        assert_eq!(json["data"]["last_stage"], "DONE");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn query_validates_input() {
        let (app, _) = test_app().await;

        let (status, json) =
            send(&app, "POST", "/api/v1/query", Some(r#"{"query":"   "}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "validation_error");

        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/query",
            Some(r#"{"query":"banks","top_k":0}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn query_returns_indexed_articles() {
        let (app, service) = test_app().await;
        service
            .run_batch(
                vec![
                    article(1, "HDFC Bank posts record profit"),
                    article(2, "Rain delays monsoon sowing"),
                ],
                "manual",
            )
            .await
            .unwrap();

        let (status, json) = send(
            &app,
            "POST",
            "/api/v1/query",
            Some(r#"{"query":"HDFC Bank results","top_k":1}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let results = json["data"]["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["id"], 1);
        assert_eq!(json["data"]["matched_entities"]["companies"][0], "HDFC Bank");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn scheduler_lifecycle_over_http() {
        let (app, _) = test_app().await;

        let (status, json) = send(
            &app,
            "POST",
            "/api/v1/scheduler/start",
            Some(r#"{"interval_secs":90}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["interval_secs"], 90);

        let (status, json) = send(&app, "POST", "/api/v1/scheduler/start", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"]["code"], "conflict");

        let (_, json) = send(&app, "GET", "/api/v1/scheduler/status", None).await;
        assert_eq!(json["data"]["running"], true);

        let (status, _) = send(&app, "POST", "/api/v1/scheduler/stop", None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, "POST", "/api/v1/scheduler/stop", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn scheduler_run_now_reports_stats() {
        let (app, _) = test_app().await;
        let (status, json) = send(&app, "POST", "/api/v1/scheduler/run-now", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["last_stage"], "DONE");

        let (_, json) = send(&app, "GET", "/api/v1/scheduler/status", None).await;
        assert_eq!(json["data"]["total_runs"], 1);
        assert_eq!(json["data"]["running"], false);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn llm_health_starts_healthy() {
        let (app, _) = test_app().await;
        let (status, json) = send(&app, "GET", "/api/v1/llm/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "healthy");
        assert_eq!(json["data"]["remaining_calls"], 60);
        assert_eq!(json["data"]["total_calls"], 0);
    }

    #[test]
    fn stage_failure_carries_partial_stats() {
        let mut stats = finnews_core::RunStats::started(3);
        stats.new = 3;
        stats.last_stage = Some(finnews_core::RunStage::Ingested);
        let error = PipelineError::StageFailed {
            stage: finnews_core::RunStage::Deduped,
            message: "embedder down".to_string(),
            stats: Box::new(stats),
        };

        let api_error = map_pipeline_error("req-1".to_string(), &error);
        let json = serde_json::to_value(&api_error).unwrap();

        assert_eq!(json["error"]["code"], "pipeline_failed");
        assert_eq!(json["error"]["details"]["partial_stats"]["fetched"], 3);
        assert_eq!(json["error"]["details"]["partial_stats"]["new"], 3);
        assert_eq!(json["error"]["details"]["partial_stats"]["indexed"], 0);
    }

    #[test]
    fn plain_errors_omit_details() {
        let api_error = map_pipeline_error("req-2".to_string(), &PipelineError::RunInProgress);
        let json = serde_json::to_value(&api_error).unwrap();
        assert_eq!(json["error"]["code"], "conflict");
        assert!(json["error"].get("details").is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn alert_stream_is_server_sent_events() {
        let (app, _) = test_app().await;
        let request = Request::builder()
            .uri("/api/v1/alerts/stream")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream"));
    }
}
