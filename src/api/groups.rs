use axum::http::Method;

use super::{ApiRequest, ApiResponse, AppState};
use crate::error::ServerError;
use crate::gitlab::MAX_PER_PAGE;
use crate::gitlab::types::Group;

pub async fn handle(state: &AppState, request: &ApiRequest) -> Result<ApiResponse, ServerError> {
    if request.method != Method::GET {
        return Err(ServerError::MethodNotAllowed);
    }
    match request.param("id") {
        Some(id) => get(state, id).await,
        None => list(state, request).await,
    }
}

async fn list(state: &AppState, request: &ApiRequest) -> Result<ApiResponse, ServerError> {
    let limit = request.limit()?;
    let mut query = vec![("per_page", limit.min(MAX_PER_PAGE).to_string())];
    if let Some(search) = request.param("search") {
        query.push(("search", search.to_string()));
    }

    let raw = state.gitlab().await?.get("groups", &query).await?;
    let mut groups: Vec<Group> = serde_json::from_value(raw)?;
    groups.truncate(limit);
    Ok(ApiResponse::ok(serde_json::to_value(groups)?))
}

async fn get(state: &AppState, id: &str) -> Result<ApiResponse, ServerError> {
    let path = format!("groups/{}", crate::gitlab::encode_id_or_path(id));
    let raw = state.gitlab().await?.get(&path, &[]).await?;
    let group: Group = serde_json::from_value(raw)?;
    Ok(ApiResponse::ok(serde_json::to_value(group)?))
}
