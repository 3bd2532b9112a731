use axum::http::Method;
use serde_json::{Value, json};

use super::{ApiRequest, ApiResponse, AppState, parse_iid};
use crate::error::ServerError;
use crate::gitlab::types::{IssueCreated, IssueDetail, IssueSummary};
use crate::gitlab::{MAX_PER_PAGE, encode_id_or_path};

pub async fn handle(state: &AppState, request: &ApiRequest) -> Result<ApiResponse, ServerError> {
    match request.method {
        Method::GET => {
            let project_id = request.require("project_id")?;
            match request.param("issue_iid") {
                Some(raw) => get(state, project_id, parse_iid(raw, "issue_iid")?).await,
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
    let mut query = vec![
        ("state", request.param("state").unwrap_or("opened").to_string()),
        ("per_page", limit.min(MAX_PER_PAGE).to_string()),
    ];
    if let Some(labels) = request.param("labels") {
        query.push(("labels", labels.to_string()));
    }

    let path = format!("projects/{}/issues", encode_id_or_path(project_id));
    let raw = state.gitlab().await?.get(&path, &query).await?;
    let mut issues: Vec<IssueSummary> = serde_json::from_value(raw)?;
    issues.truncate(limit);
    Ok(ApiResponse::ok(serde_json::to_value(issues)?))
}

async fn get(state: &AppState, project_id: &str, iid: u64) -> Result<ApiResponse, ServerError> {
    let path = format!("projects/{}/issues/{iid}", encode_id_or_path(project_id));
    let raw = state.gitlab().await?.get(&path, &[]).await?;
    let issue: IssueDetail = serde_json::from_value(raw)?;
    Ok(ApiResponse::ok(serde_json::to_value(issue)?))
}

async fn create(state: &AppState, request: &ApiRequest) -> Result<ApiResponse, ServerError> {
    let project_id = request.project_id()?;
    let title = request.require_body("title")?;

    let mut payload = json!({
        "title": title,
        "description": request.body_str("description").unwrap_or(""),
    });
    if let Some(labels) = request.body_str("labels") {
        let labels: Vec<&str> = labels.split(',').map(str::trim).collect();
        payload["labels"] = json!(labels);
    }

    let path = format!("projects/{}/issues", encode_id_or_path(project_id));
    let raw = state.gitlab().await?.post(&path, &payload).await?;
    let issue: IssueCreated = serde_json::from_value(raw)?;
    Ok(ApiResponse::created(serde_json::to_value(issue)?))
}
