//! Request handlers for the `/api/*` surface.
//!
//! Every transport funnels into [`dispatch`] with one canonical
//! [`ApiRequest`]; the MCP adapter and the axum routes therefore share a
//! single code path per operation. Handlers are stateless apart from the
//! lazily-built upstream client held in [`AppState`].

pub mod branches;
pub mod groups;
pub mod issues;
pub mod merge_requests;
pub mod pipelines;
pub mod projects;
pub mod users;

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};
use tokio::sync::OnceCell;

use crate::config::Config;
use crate::error::ServerError;
use crate::gitlab::GitLabClient;

pub const DEFAULT_LIMIT: usize = 20;

/// Shared per-process state. Cloning is cheap; the upstream client is built
/// at most once behind the `OnceCell` single-flight guard and reused for the
/// process lifetime.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    gitlab: Arc<OnceCell<GitLabClient>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            gitlab: Arc::new(OnceCell::new()),
        }
    }

    /// The shared upstream client. A missing `GITLAB_TOKEN` fails here, on
    /// first use, and on every call after that.
    pub async fn gitlab(&self) -> Result<&GitLabClient, ServerError> {
        self.gitlab
            .get_or_try_init(|| async { GitLabClient::new(&self.config) })
            .await
    }
}

/// The resource families served under `/api`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    Projects,
    Issues,
    MergeRequests,
    Pipelines,
    Branches,
    Groups,
    User,
    Users,
}

impl Resource {
    pub fn path(self) -> &'static str {
        match self {
            Self::Projects => "/api/projects",
            Self::Issues => "/api/issues",
            Self::MergeRequests => "/api/merge_requests",
            Self::Pipelines => "/api/pipelines",
            Self::Branches => "/api/branches",
            Self::Groups => "/api/groups",
            Self::User => "/api/user",
            Self::Users => "/api/users",
        }
    }
}

/// Canonical inbound request, built once at the transport boundary.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    pub method: Method,
    pub query: BTreeMap<String, String>,
    pub body: Value,
}

impl ApiRequest {
    pub fn get(query: BTreeMap<String, String>) -> Self {
        Self {
            method: Method::GET,
            query,
            body: json!({}),
        }
    }

    pub fn post(body: Value) -> Self {
        Self {
            method: Method::POST,
            query: BTreeMap::new(),
            body,
        }
    }

    pub fn options() -> Self {
        Self {
            method: Method::OPTIONS,
            query: BTreeMap::new(),
            body: json!({}),
        }
    }

    /// A malformed or absent body degrades to an empty object rather than
    /// failing the request.
    pub fn from_parts(method: Method, query: BTreeMap<String, String>, raw_body: &[u8]) -> Self {
        let body = serde_json::from_slice(raw_body).unwrap_or_else(|_| json!({}));
        Self {
            method,
            query,
            body,
        }
    }

    /// Non-empty query parameter, if present.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn require(&self, name: &str) -> Result<&str, ServerError> {
        self.param(name).ok_or_else(|| ServerError::missing(name))
    }

    /// Boolean query flag; anything other than a case-insensitive "true" is
    /// off, matching the upstream convention for `owned`/`starred`.
    pub fn flag(&self, name: &str) -> bool {
        self.param(name)
            .is_some_and(|value| value.eq_ignore_ascii_case("true"))
    }

    pub fn limit(&self) -> Result<usize, ServerError> {
        match self.param("limit") {
            None => Ok(DEFAULT_LIMIT),
            Some(raw) => raw
                .parse()
                .map_err(|_| ServerError::Validation("limit parameter must be an integer".to_string())),
        }
    }

    /// Non-empty string field from the JSON body.
    pub fn body_str(&self, name: &str) -> Option<&str> {
        self.body
            .get(name)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn require_body(&self, name: &str) -> Result<&str, ServerError> {
        self.body_str(name).ok_or_else(|| ServerError::missing(name))
    }

    /// Project identifier for POST handlers: body first, query as fallback.
    pub fn project_id(&self) -> Result<&str, ServerError> {
        self.body_str("project_id")
            .or_else(|| self.param("project_id"))
            .ok_or_else(|| ServerError::missing("project_id"))
    }

    /// Numeric identifier accepted as a JSON number, a numeric string in the
    /// body, or a query parameter.
    pub fn id(&self, name: &str) -> Result<u64, ServerError> {
        let raw = match self.body.get(name) {
            Some(Value::Number(number)) => return number.as_u64().ok_or_else(|| bad_id(name)),
            Some(Value::String(text)) if !text.is_empty() => text.as_str(),
            _ => self.param(name).ok_or_else(|| ServerError::missing(name))?,
        };
        raw.parse().map_err(|_| bad_id(name))
    }
}

fn bad_id(name: &str) -> ServerError {
    ServerError::Validation(format!("{name} parameter must be an integer"))
}

/// Parse a query-supplied IID (`issue_iid`, `mr_iid`, ...).
pub fn parse_iid(raw: &str, name: &str) -> Result<u64, ServerError> {
    raw.parse().map_err(|_| bad_id(name))
}

#[derive(Clone, Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    pub fn created(body: Value) -> Self {
        Self {
            status: StatusCode::CREATED,
            body,
        }
    }

    /// Empty 200, used for CORS preflight.
    pub fn empty() -> Self {
        Self {
            status: StatusCode::OK,
            body: Value::Null,
        }
    }
}

/// Route one canonical request to its handler and flatten any failure into a
/// structured `{"error": ...}` body. This is the single entry point for both
/// the HTTP routes and the tool adapter.
pub async fn dispatch(state: &AppState, resource: Resource, request: ApiRequest) -> ApiResponse {
    if request.method == Method::OPTIONS {
        return ApiResponse::empty();
    }

    let result = match resource {
        Resource::Projects => projects::handle(state, &request).await,
        Resource::Issues => issues::handle(state, &request).await,
        Resource::MergeRequests => merge_requests::handle(state, &request).await,
        Resource::Pipelines => pipelines::handle(state, &request).await,
        Resource::Branches => branches::handle(state, &request).await,
        Resource::Groups => groups::handle(state, &request).await,
        Resource::User => users::current(state, &request).await,
        Resource::Users => users::list(state, &request).await,
    };

    match result {
        Ok(response) => response,
        Err(error) => {
            if error.status_code().is_server_error() {
                tracing::error!("{} handler failed: {error}", resource.path());
            }
            ApiResponse {
                status: error.status_code(),
                body: json!({"error": error.to_string()}),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_state() -> AppState {
        AppState::new(Config {
            gitlab_url: "https://gitlab.example.com/api/v4".to_string(),
            gitlab_token: None,
            api_tokens: Vec::new(),
            server_token: None,
        })
    }

    fn query(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_malformed_body_degrades_to_empty_object() {
        let request = ApiRequest::from_parts(Method::POST, BTreeMap::new(), b"{not json");
        assert_eq!(request.body, json!({}));
    }

    #[test]
    fn test_limit_default_and_validation() {
        let request = ApiRequest::get(BTreeMap::new());
        assert_eq!(request.limit().unwrap(), DEFAULT_LIMIT);

        let request = ApiRequest::get(query(&[("limit", "5")]));
        assert_eq!(request.limit().unwrap(), 5);

        let request = ApiRequest::get(query(&[("limit", "lots")]));
        let err = request.limit().unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_require_reports_the_parameter_name() {
        let request = ApiRequest::get(BTreeMap::new());
        let err = request.require("project_id").unwrap_err();
        assert_eq!(err.to_string(), "project_id parameter is required");
    }

    #[test]
    fn test_empty_query_values_count_as_absent() {
        let request = ApiRequest::get(query(&[("search", "")]));
        assert!(request.param("search").is_none());
    }

    #[test]
    fn test_flag_parsing() {
        let request = ApiRequest::get(query(&[("owned", "TRUE"), ("starred", "no")]));
        assert!(request.flag("owned"));
        assert!(!request.flag("starred"));
        assert!(!request.flag("missing"));
    }

    #[test]
    fn test_id_accepts_number_string_and_query() {
        let request = ApiRequest::post(json!({"pipeline_id": 9}));
        assert_eq!(request.id("pipeline_id").unwrap(), 9);

        let request = ApiRequest::post(json!({"pipeline_id": "9"}));
        assert_eq!(request.id("pipeline_id").unwrap(), 9);

        let request = ApiRequest::get(query(&[("pipeline_id", "9")]));
        assert_eq!(request.id("pipeline_id").unwrap(), 9);

        let request = ApiRequest::post(json!({"pipeline_id": "nine"}));
        assert!(request.id("pipeline_id").is_err());
    }

    #[tokio::test]
    async fn test_options_short_circuits_without_auth_or_client() {
        let state = bare_state();
        let response = dispatch(&state, Resource::Issues, ApiRequest::options()).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, Value::Null);
    }

    #[tokio::test]
    async fn test_unsupported_method_maps_to_405() {
        let state = bare_state();
        let request = ApiRequest {
            method: Method::DELETE,
            query: BTreeMap::new(),
            body: json!({}),
        };
        let response = dispatch(&state, Resource::Groups, request).await;
        assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.body["error"], "Method not allowed");
    }

    #[tokio::test]
    async fn test_validation_beats_client_initialization() {
        // No GITLAB_TOKEN configured, but the missing parameter must win.
        let state = bare_state();
        let response = dispatch(&state, Resource::Issues, ApiRequest::get(BTreeMap::new())).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body["error"], "project_id parameter is required");
    }
}
