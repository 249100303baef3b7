use derive_more::derive::Display;
use reqwest::StatusCode;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Display)]
pub enum AppError {
    /// Credentials are missing, expired or revoked. Aborts the run.
    #[display("Authentication failed: {_0}")]
    Auth(String),
    /// Network or provider hiccup, safe to retry
    #[display("Transient provider error: {_0}")]
    Transient(String),
    /// The resource vanished between listing and fetching
    #[display("Not found: {_0}")]
    NotFound(String),
    #[display("Bad request: {_0}")]
    BadRequest(String),
    #[display("Too many requests")]
    TooManyRequests,
    #[display("Configuration error: {_0}")]
    Config(String),
    #[display("Internal error: {_0}")]
    Internal(anyhow::Error),
}

impl std::error::Error for AppError {}

impl AppError {
    /// Whether the failed call may succeed if issued again
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Transient(_) | AppError::TooManyRequests)
    }

    /// Map a non-success HTTP status returned by a provider
    pub fn from_status(status: StatusCode, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Auth(body),
            StatusCode::NOT_FOUND => AppError::NotFound(body),
            StatusCode::TOO_MANY_REQUESTS => AppError::TooManyRequests,
            StatusCode::REQUEST_TIMEOUT => AppError::Transient(body),
            StatusCode::BAD_REQUEST => AppError::BadRequest(body),
            s if s.is_server_error() => AppError::Transient(format!("{s}: {body}")),
            s => AppError::Internal(anyhow::anyhow!("Unexpected status {s}: {body}")),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal(error)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        tracing::debug!("Reqwest error: {:?}", error);
        if let Some(status) = error.status() {
            return AppError::from_status(status, error.to_string());
        }
        if error.is_timeout() || error.is_connect() || error.is_request() {
            return AppError::Transient(error.to_string());
        }
        AppError::Internal(error.into())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(error: config::ConfigError) -> Self {
        AppError::Config(error.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        AppError::Internal(error.into())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        AppError::Internal(error.into())
    }
}
