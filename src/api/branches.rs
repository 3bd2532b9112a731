use axum::http::Method;

use super::{ApiRequest, ApiResponse, AppState};
use crate::error::ServerError;
use crate::gitlab::types::Branch;
use crate::gitlab::{MAX_PER_PAGE, encode_id_or_path};

pub async fn handle(state: &AppState, request: &ApiRequest) -> Result<ApiResponse, ServerError> {
    if request.method != Method::GET {
        return Err(ServerError::MethodNotAllowed);
    }
    let project_id = request.require("project_id")?;
    match request.param("branch") {
        Some(branch) => get(state, project_id, branch).await,
        None => list(state, project_id, request).await,
    }
}

async fn list(
    state: &AppState,
    project_id: &str,
    request: &ApiRequest,
) -> Result<ApiResponse, ServerError> {
    let limit = request.limit()?;
    let mut query = vec![("per_page", limit.min(MAX_PER_PAGE).to_string())];
    if let Some(search) = request.param("search") {
        query.push(("search", search.to_string()));
    }

    let path = format!(
        "projects/{}/repository/branches",
        encode_id_or_path(project_id)
    );
    let raw = state.gitlab().await?.get(&path, &query).await?;
    let mut branches: Vec<Branch> = serde_json::from_value(raw)?;
    branches.truncate(limit);
    Ok(ApiResponse::ok(serde_json::to_value(branches)?))
}

async fn get(state: &AppState, project_id: &str, branch: &str) -> Result<ApiResponse, ServerError> {
    // Branch names may themselves contain slashes.
    let path = format!(
        "projects/{}/repository/branches/{}",
        encode_id_or_path(project_id),
        urlencoding::encode(branch)
    );
    let raw = state.gitlab().await?.get(&path, &[]).await?;
    let branch: Branch = serde_json::from_value(raw)?;
    Ok(ApiResponse::ok(serde_json::to_value(branch)?))
}
