use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use service::{ServiceError, ValidationError};
use thiserror::Error;
use tracing::{error, warn};

/// Plain-text error response. Message bodies end with a newline.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match &e {
            ServiceError::InvalidArgument(_) | ServiceError::InsufficientStock { .. } => {
                Self::bad_request(e.to_string())
            }
            ServiceError::Store(_) => {
                Self { status: StatusCode::SERVICE_UNAVAILABLE, message: e.to_string() }
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ServiceError::from(e).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, error = %self.message, "request failed");
        } else {
            warn!(status = %self.status, error = %self.message, "request rejected");
        }
        let body = format!("{}\n", self.message);
        (self.status, [(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("counter store unavailable: {0}")]
    Store(#[from] service::StoreError),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
