use axum::http::Method;

use super::{ApiRequest, ApiResponse, AppState};
use crate::error::ServerError;
use crate::gitlab::MAX_PER_PAGE;
use crate::gitlab::types::{CurrentUser, UserSummary};

/// `/api/user`: the identity behind the configured credential.
pub async fn current(state: &AppState, request: &ApiRequest) -> Result<ApiResponse, ServerError> {
    if request.method != Method::GET {
        return Err(ServerError::MethodNotAllowed);
    }
    let raw = state.gitlab().await?.get("user", &[]).await?;
    let user: CurrentUser = serde_json::from_value(raw)?;
    Ok(ApiResponse::ok(serde_json::to_value(user)?))
}

/// `/api/users`: user directory search.
pub async fn list(state: &AppState, request: &ApiRequest) -> Result<ApiResponse, ServerError> {
    if request.method != Method::GET {
        return Err(ServerError::MethodNotAllowed);
    }
    let limit = request.limit()?;
    let active = request
        .param("active")
        .map(|value| value.eq_ignore_ascii_case("true"))
        .unwrap_or(true);
    let mut query = vec![
        ("active", active.to_string()),
        ("per_page", limit.min(MAX_PER_PAGE).to_string()),
    ];
    if let Some(search) = request.param("search") {
        query.push(("search", search.to_string()));
    }
    if let Some(username) = request.param("username") {
        query.push(("username", username.to_string()));
    }

    let raw = state.gitlab().await?.get("users", &query).await?;
    let mut users: Vec<UserSummary> = serde_json::from_value(raw)?;
    users.truncate(limit);
    Ok(ApiResponse::ok(serde_json::to_value(users)?))
}
