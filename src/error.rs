use actix_web::{http::StatusCode, HttpResponse, HttpResponseBuilder};
use serde::Serialize;

/// Machine readable error categories returned to API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    DuplicateEmail,
    RateLimited,
    NotFound,
    Unauthorized,
    InvalidTransition,
    DatabaseError,
    NetworkError,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    // seconds, only set for rate limited requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code,
                message: message.into(),
                retry_after: None,
            },
        }
    }

    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.error.retry_after = Some(seconds);
        self
    }

    pub fn respond(self, status: StatusCode) -> HttpResponse {
        HttpResponseBuilder::new(status).json(self)
    }
}

/// Prints an error followed by every error in its `source` chain.
pub fn error_chain_fmt(
    err: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}", err)?;

    let mut current = err.source();

    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }

    Ok(())
}
