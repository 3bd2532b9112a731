use std::time::Duration;

use reqwest::{
    Client, RequestBuilder,
    header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde_json::Value;
use url::Url;

use crate::config::Config;
use crate::error::ServerError;

/// Hard ceiling on the page size forwarded upstream.
pub const MAX_PER_PAGE: usize = 100;

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// One HTTP call per request against the GitLab REST API. No retry, no
/// pagination following; a timeout is fatal for the call.
pub struct GitLabClient {
    http: Client,
    base_url: Url,
}

impl GitLabClient {
    pub fn new(config: &Config) -> Result<Self, ServerError> {
        let token = config.gitlab_token.clone().ok_or_else(|| {
            ServerError::Config(
                "GITLAB_TOKEN environment variable is required. \
                 Get a personal access token from GitLab with 'api' scope."
                    .to_string(),
            )
        })?;
        let base_url = Url::parse(&config.gitlab_url)
            .map_err(|e| ServerError::Config(format!("invalid GitLab base URL: {e}")))?;

        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ServerError::Config("GITLAB_TOKEN contains invalid characters".to_string()))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .user_agent(concat!("gitlab-mcp/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(UPSTREAM_TIMEOUT)
            .build()?;

        Ok(Self { http, base_url })
    }

    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ServerError> {
        self.send(self.http.get(self.endpoint(path)).query(query)).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, ServerError> {
        self.send(self.http.post(self.endpoint(path)).json(body)).await
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, ServerError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error response".to_string());
            tracing::warn!("GitLab returned {status}: {message}");
            return Err(ServerError::Remote {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<Value>().await?)
    }
}

/// Make a project identifier safe to embed in an upstream path.
///
/// Numeric ids pass through; `group/project` paths are percent-encoded so the
/// slash survives as `%2F`.
pub fn encode_id_or_path(project_id: &str) -> String {
    if project_id.contains('/') {
        urlencoding::encode(project_id).into_owned()
    } else {
        project_id.to_string()
    }
}
