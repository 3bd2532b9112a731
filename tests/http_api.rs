//! Router-level behavior: CORS, the bearer gates, health and docs.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use gitlab_mcp::api::AppState;
use gitlab_mcp::config::Config;
use gitlab_mcp::http;

fn state(gitlab_url: &str, api_tokens: &[&str], server_token: Option<&str>) -> AppState {
    AppState::new(Config {
        gitlab_url: gitlab_url.to_string(),
        gitlab_token: Some("test-token".to_string()),
        api_tokens: api_tokens.iter().map(|t| t.to_string()).collect(),
        server_token: server_token.map(String::from),
    })
}

fn open_state() -> AppState {
    state("https://gitlab.example.com/api/v4", &[], None)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn options_preflight_returns_cors_headers_and_empty_body() {
    let app = http::router(open_state());
    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/issues")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers().clone();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "GET, POST, OPTIONS");
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
        "Content-Type, Authorization"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn options_preflight_skips_the_bearer_gate() {
    let app = http::router(state("https://gitlab.example.com/api/v4", &["t1"], None));
    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/projects")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_bearer_token_is_401_with_challenge() {
    let app = http::router(state("https://gitlab.example.com/api/v4", &["t1"], None));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/user")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("Authorization"));
}

#[tokio::test]
async fn wrong_bearer_token_is_denied() {
    let app = http::router(state("https://gitlab.example.com/api/v4", &["t1"], None));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/user")
                .header(header::AUTHORIZATION, "Bearer t2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert!(!body["error"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn accepted_bearer_token_reaches_upstream() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/user")
        .with_status(200)
        .with_body(
            json!({
                "id": 1,
                "username": "alice",
                "name": "Alice",
                "email": null,
                "avatar_url": null,
                "web_url": "https://gitlab.example.com/alice"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let app = http::router(state(&server.url(), &["t1"], None));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/user")
                .header(header::AUTHORIZATION, "Bearer t1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["username"], "alice");
}

#[tokio::test]
async fn unsupported_method_is_405() {
    let app = http::router(open_state());
    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/groups")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Method not allowed");
}

#[tokio::test]
async fn health_reports_service_and_tools() {
    let app = http::router(open_state());
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "gitlab-mcp");
    assert!(body["version"].is_string());
    let tools: Vec<&str> = body["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|name| name.as_str().unwrap())
        .collect();
    assert!(tools.contains(&"create_issue"));
    assert!(tools.contains(&"list_projects"));
}

#[tokio::test]
async fn root_serves_the_same_health_payload() {
    let app = http::router(open_state());
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn health_honors_the_server_token_gate() {
    let app = http::router(state("https://gitlab.example.com/api/v4", &[], Some("s1")));
    let denied = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

    let allowed = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(header::AUTHORIZATION, "Bearer s1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(allowed.status(), StatusCode::OK);
}

#[tokio::test]
async fn docs_describe_the_api_surface() {
    let app = http::router(open_state());
    let response = app
        .oneshot(Request::builder().uri("/api").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let endpoints = body["endpoints"].as_object().unwrap();
    assert!(endpoints.contains_key("/api/issues"));
    assert!(endpoints.contains_key("/api/projects"));
    let issue_ops = endpoints["/api/issues"].as_array().unwrap();
    assert!(issue_ops.iter().any(|op| op["method"] == "POST"));
}
