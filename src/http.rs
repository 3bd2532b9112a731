//! The REST surface: axum routes over the shared handler dispatch, the
//! bearer middleware, and the health and documentation endpoints.

use std::collections::BTreeMap;

use axum::{
    Router,
    body::Bytes,
    extract::{Query, Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, get},
};
use serde_json::{Value, json};

use crate::api::{self, ApiRequest, ApiResponse, AppState, Resource};
use crate::auth;
use crate::registry;

/// The three permissive cross-origin headers attached to every response.
fn cors_headers() -> [(header::HeaderName, HeaderValue); 3] {
    [
        (
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ),
        (
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, OPTIONS"),
        ),
        (
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, Authorization"),
        ),
    ]
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/projects", any(projects))
        .route("/api/issues", any(issues))
        .route("/api/merge_requests", any(merge_requests))
        .route("/api/pipelines", any(pipelines))
        .route("/api/branches", any(branches))
        .route("/api/groups", any(groups))
        .route("/api/user", any(user))
        .route("/api/users", any(users))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_token,
        ));

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api", get(docs))
        .merge(api)
        .with_state(state)
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let mut response = match &self.body {
            Value::Null => self.status.into_response(),
            body => {
                let text =
                    serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string());
                let mut response = (self.status, text).into_response();
                response.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
                response
            }
        };
        for (name, value) in cors_headers() {
            response.headers_mut().insert(name, value);
        }
        response
    }
}

/// Bearer gate for the resource routes. CORS preflight is exempt.
async fn require_api_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    match auth::check(&state.config.api_tokens, presented) {
        Ok(()) => next.run(request).await,
        Err(reason) => unauthorized(reason),
    }
}

fn unauthorized(reason: String) -> Response {
    let mut response = ApiResponse {
        status: StatusCode::UNAUTHORIZED,
        body: json!({"error": reason}),
    }
    .into_response();
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    response
}

fn bearer_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

async fn health(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(reason) =
        auth::check_single(state.config.server_token.as_deref(), bearer_header(&headers))
    {
        return unauthorized(reason);
    }
    ApiResponse::ok(json!({
        "status": "ok",
        "service": "gitlab-mcp",
        "version": env!("CARGO_PKG_VERSION"),
        "tools": registry::tool_names(),
        "note": "Tool calls and /api requests forward to the configured GitLab instance.",
    }))
    .into_response()
}

async fn docs(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(reason) =
        auth::check_single(state.config.server_token.as_deref(), bearer_header(&headers))
    {
        return unauthorized(reason);
    }
    ApiResponse::ok(registry::docs().clone()).into_response()
}

async fn projects(
    state: State<AppState>,
    method: Method,
    query: Query<BTreeMap<String, String>>,
    body: Bytes,
) -> ApiResponse {
    serve(state, Resource::Projects, method, query, body).await
}

async fn issues(
    state: State<AppState>,
    method: Method,
    query: Query<BTreeMap<String, String>>,
    body: Bytes,
) -> ApiResponse {
    serve(state, Resource::Issues, method, query, body).await
}

async fn merge_requests(
    state: State<AppState>,
    method: Method,
    query: Query<BTreeMap<String, String>>,
    body: Bytes,
) -> ApiResponse {
    serve(state, Resource::MergeRequests, method, query, body).await
}

async fn pipelines(
    state: State<AppState>,
    method: Method,
    query: Query<BTreeMap<String, String>>,
    body: Bytes,
) -> ApiResponse {
    serve(state, Resource::Pipelines, method, query, body).await
}

async fn branches(
    state: State<AppState>,
    method: Method,
    query: Query<BTreeMap<String, String>>,
    body: Bytes,
) -> ApiResponse {
    serve(state, Resource::Branches, method, query, body).await
}

async fn groups(
    state: State<AppState>,
    method: Method,
    query: Query<BTreeMap<String, String>>,
    body: Bytes,
) -> ApiResponse {
    serve(state, Resource::Groups, method, query, body).await
}

async fn user(
    state: State<AppState>,
    method: Method,
    query: Query<BTreeMap<String, String>>,
    body: Bytes,
) -> ApiResponse {
    serve(state, Resource::User, method, query, body).await
}

async fn users(
    state: State<AppState>,
    method: Method,
    query: Query<BTreeMap<String, String>>,
    body: Bytes,
) -> ApiResponse {
    serve(state, Resource::Users, method, query, body).await
}

async fn serve(
    State(state): State<AppState>,
    resource: Resource,
    method: Method,
    Query(query): Query<BTreeMap<String, String>>,
    body: Bytes,
) -> ApiResponse {
    let request = ApiRequest::from_parts(method, query, &body);
    api::dispatch(&state, resource, request).await
}
