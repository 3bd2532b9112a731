use axum::http::StatusCode;
use thiserror::Error;

/// Everything that can go wrong while serving one inbound call.
///
/// Each variant maps to exactly one HTTP status; nothing is retried and no
/// failure outlives the call that produced it.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The upstream credential is missing or the client could not be built.
    #[error("{0}")]
    Config(String),

    /// A required or malformed inbound parameter.
    #[error("{0}")]
    Validation(String),

    /// Bearer gate rejection.
    #[error("{0}")]
    Auth(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    /// GitLab answered with a non-2xx status.
    #[error("GitLab API error ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("request to GitLab failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid JSON from GitLab: {0}")]
    Json(#[from] serde_json::Error),
}

impl ServerError {
    /// Standard message for an absent required parameter.
    pub fn missing(name: &str) -> Self {
        Self::Validation(format!("{name} parameter is required"))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Config(_) | Self::Remote { .. } | Self::Network(_) | Self::Json(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
