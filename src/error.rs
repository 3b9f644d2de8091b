use std::collections::BTreeMap;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::{
    repository::RepositoryError,
    response::{ApiResponse, messages},
};

/// Field name -> list of human-readable problems.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// ApiError
///
/// Every failure a handler can return. Rendering always goes through the
/// [`ApiResponse`] envelope, so clients never see a bare status or a stack trace.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Empty or invalid input (422). `errors` carries per-field details when known.
    #[error("{message}")]
    Validation {
        message: String,
        errors: Option<FieldErrors>,
    },

    /// No matching record (404).
    #[error("{0}")]
    NotFound(String),

    /// The operation does not apply to the record's current state (400).
    #[error("{0}")]
    InvalidState(String),

    /// Bad credentials, bad refresh token or missing bearer (401).
    #[error("{0}")]
    Unauthorized(String),

    /// Unexpected failure whose message is meant for the client (500).
    #[error("{0}")]
    Internal(String),

    /// Store failure; the cause is logged, never rendered (500).
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            errors: None,
        }
    }

    pub fn invalid_fields(errors: FieldErrors) -> Self {
        ApiError::Validation {
            message: messages::INVALID_DATA.to_string(),
            errors: Some(errors),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidState(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) | ApiError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert("body".to_string(), vec![rejection.body_text()]);
        ApiError::invalid_fields(errors)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (message, data) = match self {
            ApiError::Validation { message, errors } => {
                let data = errors.and_then(|e| serde_json::to_value(e).ok());
                (message, data)
            }
            ApiError::NotFound(message)
            | ApiError::InvalidState(message)
            | ApiError::Unauthorized(message)
            | ApiError::Internal(message) => (message, None),
            ApiError::Repository(e) => {
                tracing::error!("repository error: {:?}", e);
                (messages::INTERNAL_ERROR.to_string(), None)
            }
        };

        ApiResponse::<Value>::failure(data, message, status).into_response()
    }
}
