use axum::{
    extract::rejection::FormRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::common::response::ApiError;
use crate::infrastructure::podcast_host::HostError;

pub type AppResult<T> = Result<T, AppError>;

/// Request-level failures, each mapped to one HTTP status.
#[derive(Error, Debug)]
pub enum AppError {
    /// Bad or missing form input; the message is meant for the user
    #[error("{0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("Upload too large")]
    PayloadTooLarge,

    /// The podcast host refused or failed a call
    #[error("{0}")]
    ExternalApi(String),

    /// A batch stopped after some podcasts already received their episode
    #[error("{message}. Already published: {published}")]
    PartiallyPublished {
        status: StatusCode,
        message: String,
        published: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::ExternalApi(_) => StatusCode::BAD_GATEWAY,
            AppError::PartiallyPublished { status, .. } => *status,
            AppError::Database(_) | AppError::Io(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The message sent to the client. Server-side failures are logged and masked.
    pub fn public_message(&self) -> String {
        match self {
            AppError::PartiallyPublished { .. } => self.to_string(),
            _ if self.status() == StatusCode::INTERNAL_SERVER_ERROR => {
                error!("Internal error: {}", self);
                "Internal Server Error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl From<HostError> for AppError {
    fn from(e: HostError) -> Self {
        match e {
            HostError::EpisodeNotFound { id } => {
                AppError::NotFound(format!("Episode with ID {} doesn't exist", id))
            }
            other => AppError::ExternalApi(other.to_string()),
        }
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// The first failing field in `field_order`, using that field's own message.
pub fn validation_error(errors: &validator::ValidationErrors, field_order: &[&str]) -> AppError {
    let field_errors = errors.field_errors();

    let message = field_order
        .iter()
        .filter_map(|field| field_errors.get(*field))
        .flat_map(|errs| errs.iter())
        .find_map(|err| err.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Invalid form data".to_string());

    AppError::Validation(message)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        ApiError(self.public_message(), self.status()).into_response()
    }
}
