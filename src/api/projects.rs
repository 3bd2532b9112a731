use axum::http::Method;
use serde_json::{Value, json};

use super::{ApiRequest, ApiResponse, AppState};
use crate::error::ServerError;
use crate::gitlab::types::{ProjectDetail, ProjectSummary};
use crate::gitlab::{MAX_PER_PAGE, encode_id_or_path};

pub async fn handle(state: &AppState, request: &ApiRequest) -> Result<ApiResponse, ServerError> {
    match request.method {
        Method::GET => match request.param("id") {
            Some(id) => get(state, id).await,
            None => list(state, request).await,
        },
        Method::POST => create(state, request).await,
        _ => Err(ServerError::MethodNotAllowed),
    }
}

async fn list(state: &AppState, request: &ApiRequest) -> Result<ApiResponse, ServerError> {
    let limit = request.limit()?;
    let mut query = vec![("per_page", limit.min(MAX_PER_PAGE).to_string())];
    if request.flag("owned") {
        query.push(("owned", "true".to_string()));
    }
    if request.flag("starred") {
        query.push(("starred", "true".to_string()));
    }
    if let Some(search) = request.param("search") {
        query.push(("search", search.to_string()));
    }

    let raw = state.gitlab().await?.get("projects", &query).await?;
    let mut projects: Vec<ProjectSummary> = serde_json::from_value(raw)?;
    projects.truncate(limit);
    Ok(ApiResponse::ok(serde_json::to_value(projects)?))
}

async fn get(state: &AppState, id: &str) -> Result<ApiResponse, ServerError> {
    let path = format!("projects/{}", encode_id_or_path(id));
    let raw = state.gitlab().await?.get(&path, &[]).await?;
    let project: ProjectDetail = serde_json::from_value(raw)?;
    Ok(ApiResponse::ok(serde_json::to_value(project)?))
}

async fn create(state: &AppState, request: &ApiRequest) -> Result<ApiResponse, ServerError> {
    let name = request.require_body("name")?;

    let mut payload = json!({
        "name": name,
        "visibility": request.body_str("visibility").unwrap_or("private"),
        "initialize_with_readme": request
            .body
            .get("initialize_with_readme")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    });
    if let Some(path) = request.body_str("path") {
        payload["path"] = json!(path);
    }
    if let Some(namespace_id) = request.body.get("namespace_id").and_then(Value::as_u64) {
        payload["namespace_id"] = json!(namespace_id);
    }
    if let Some(description) = request.body_str("description") {
        payload["description"] = json!(description);
    }

    let raw = state.gitlab().await?.post("projects", &payload).await?;
    let project: ProjectDetail = serde_json::from_value(raw)?;
    Ok(ApiResponse::created(serde_json::to_value(project)?))
}
