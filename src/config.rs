use crate::auth;

pub const DEFAULT_GITLAB_URL: &str = "https://gitlab.com/api/v4";

/// Runtime configuration, read once from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// GitLab REST API base, e.g. `https://gitlab.com/api/v4`.
    pub gitlab_url: String,
    /// Credential for upstream calls. Checked at first client use, not here,
    /// so tool listing and CORS preflight work on an unconfigured process.
    pub gitlab_token: Option<String>,
    /// Allow-list for the `/api/*` bearer gate. Empty means open.
    pub api_tokens: Vec<String>,
    /// Single token guarding the health and docs endpoints, if set.
    pub server_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Tests inject maps here so
    /// they never have to mutate process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let gitlab_url = lookup("GITLAB_URL")
            .or_else(|| lookup("GITLAB_BASE_URL"))
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_GITLAB_URL.to_string());
        let gitlab_token = lookup("GITLAB_TOKEN").filter(|token| !token.is_empty());
        let api_tokens = lookup("API_BEARER_TOKENS")
            .map(|raw| auth::parse_allowlist(&raw))
            .unwrap_or_default();
        let server_token = lookup("SERVER_BEARER_TOKEN").filter(|token| !token.is_empty());
        Self {
            gitlab_url,
            gitlab_token,
            api_tokens,
            server_token,
        }
    }
}
