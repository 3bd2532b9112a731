use axum::http::Method;
use serde_json::{Value, json};

use super::{ApiRequest, ApiResponse, AppState, parse_iid};
use crate::error::ServerError;
use crate::gitlab::types::{MergeRequestDetail, MergeRequestSummary};
use crate::gitlab::{MAX_PER_PAGE, encode_id_or_path};

pub async fn handle(state: &AppState, request: &ApiRequest) -> Result<ApiResponse, ServerError> {
    match request.method {
        Method::GET => {
            let project_id = request.require("project_id")?;
            match request.param("mr_iid") {
                Some(raw) => get(state, project_id, parse_iid(raw, "mr_iid")?).await,
                None => list(state, project_id, request).await,
            }
        }
        Method::POST => create(state, request).await,
        _ => Err(ServerError::MethodNotAllowed),
    }
}

async fn list(
    state: &AppState,
    project_id: &str,
    request: &ApiRequest,
) -> Result<ApiResponse, ServerError> {
    let limit = request.limit()?;
    let query = vec![
        ("state", request.param("state").unwrap_or("opened").to_string()),
        ("per_page", limit.min(MAX_PER_PAGE).to_string()),
    ];

    let path = format!("projects/{}/merge_requests", encode_id_or_path(project_id));
    let raw = state.gitlab().await?.get(&path, &query).await?;
    let mut merge_requests: Vec<MergeRequestSummary> = serde_json::from_value(raw)?;
    merge_requests.truncate(limit);
    Ok(ApiResponse::ok(serde_json::to_value(merge_requests)?))
}

async fn get(state: &AppState, project_id: &str, iid: u64) -> Result<ApiResponse, ServerError> {
    let path = format!(
        "projects/{}/merge_requests/{iid}",
        encode_id_or_path(project_id)
    );
    let raw = state.gitlab().await?.get(&path, &[]).await?;
    let merge_request: MergeRequestDetail = serde_json::from_value(raw)?;
    Ok(ApiResponse::ok(serde_json::to_value(merge_request)?))
}

async fn create(state: &AppState, request: &ApiRequest) -> Result<ApiResponse, ServerError> {
    let project_id = request.project_id()?;
    let source_branch = request.require_body("source_branch")?;
    let target_branch = request.require_body("target_branch")?;
    let title = request.require_body("title")?;

    let mut payload = json!({
        "source_branch": source_branch,
        "target_branch": target_branch,
        "title": title,
        "remove_source_branch": request
            .body
            .get("remove_source_branch")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    });
    if let Some(description) = request.body_str("description") {
        payload["description"] = json!(description);
    }
    if let Some(labels) = request.body_str("labels") {
        payload["labels"] = json!(labels);
    }

    let path = format!("projects/{}/merge_requests", encode_id_or_path(project_id));
    let raw = state.gitlab().await?.post(&path, &payload).await?;
    let merge_request: MergeRequestDetail = serde_json::from_value(raw)?;
    Ok(ApiResponse::created(serde_json::to_value(merge_request)?))
}
