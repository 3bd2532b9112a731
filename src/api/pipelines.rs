use axum::http::Method;
use serde_json::json;

use super::{ApiRequest, ApiResponse, AppState, parse_iid};
use crate::error::ServerError;
use crate::gitlab::types::Pipeline;
use crate::gitlab::{MAX_PER_PAGE, encode_id_or_path};

pub async fn handle(state: &AppState, request: &ApiRequest) -> Result<ApiResponse, ServerError> {
    match request.method {
        Method::GET => {
            let project_id = request.require("project_id")?;
            match request.param("pipeline_id") {
                Some(raw) => get(state, project_id, parse_iid(raw, "pipeline_id")?).await,
                None => list(state, project_id, request).await,
            }
        }
        // POST cancels a running pipeline.
        Method::POST => cancel(state, request).await,
        _ => Err(ServerError::MethodNotAllowed),
    }
}

async fn list(
    state: &AppState,
    project_id: &str,
    request: &ApiRequest,
) -> Result<ApiResponse, ServerError> {
    let limit = request.limit()?;
    let mut query = vec![("per_page", limit.min(MAX_PER_PAGE).to_string())];
    if let Some(status) = request.param("status") {
        query.push(("status", status.to_string()));
    }

    let path = format!("projects/{}/pipelines", encode_id_or_path(project_id));
    let raw = state.gitlab().await?.get(&path, &query).await?;
    let mut pipelines: Vec<Pipeline> = serde_json::from_value(raw)?;
    pipelines.truncate(limit);
    Ok(ApiResponse::ok(serde_json::to_value(pipelines)?))
}

async fn get(state: &AppState, project_id: &str, id: u64) -> Result<ApiResponse, ServerError> {
    let path = format!("projects/{}/pipelines/{id}", encode_id_or_path(project_id));
    let raw = state.gitlab().await?.get(&path, &[]).await?;
    let pipeline: Pipeline = serde_json::from_value(raw)?;
    Ok(ApiResponse::ok(serde_json::to_value(pipeline)?))
}

async fn cancel(state: &AppState, request: &ApiRequest) -> Result<ApiResponse, ServerError> {
    let project_id = request.project_id()?;
    let id = request.id("pipeline_id")?;

    let path = format!(
        "projects/{}/pipelines/{id}/cancel",
        encode_id_or_path(project_id)
    );
    let raw = state.gitlab().await?.post(&path, &json!({})).await?;
    let pipeline: Pipeline = serde_json::from_value(raw)?;
    Ok(ApiResponse::ok(serde_json::to_value(pipeline)?))
}
