use axum::{
    extract::{Query, State},
    Extension, Json,
};
use finnews_core::{QueryResponse, RunStats};
use finnews_pipeline::UsageSnapshot;
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_pipeline_error, map_query_error, ApiError, ApiResponse, AppState};

const DEFAULT_TOP_K: usize = 5;

#[derive(Debug, Deserialize)]
pub(super) struct RunQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub(super) struct QueryRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

pub(super) async fn run_pipeline(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<RunQuery>,
) -> Result<Json<ApiResponse<RunStats>>, ApiError> {
    let stats = state
        .service
        .trigger_pipeline_run(params.limit)
        .await
        .map_err(|e| map_pipeline_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(stats, req_id.0)))
}

pub(super) async fn last_run(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Option<RunStats>>> {
    Json(ApiResponse::new(state.service.last_run(), req_id.0))
}

pub(super) async fn query(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<QueryRequest>,
) -> Result<Json<ApiResponse<QueryResponse>>, ApiError> {
    let response = state
        .service
        .query(&body.query, body.top_k)
        .await
        .map_err(|e| map_query_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(response, req_id.0)))
}

pub(super) async fn llm_health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<UsageSnapshot>> {
    Json(ApiResponse::new(state.service.usage_health(), req_id.0))
}

#[cfg(test)]
mod tests {
    use super::QueryRequest;

    #[test]
    fn query_request_defaults_top_k() {
        let req: QueryRequest = serde_json::from_str(r#"{"query":"RBI policy"}"#).unwrap();
        assert_eq!(req.top_k, 5);
    }
}
