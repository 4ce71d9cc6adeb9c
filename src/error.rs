use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// ApiError
///
/// Every failure a workflow can surface. The `IntoResponse` impl below is the single
/// place where failure kinds are mapped onto HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed input. Carries one message per offending field.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// The request is well-formed but violates a business rule.
    #[error("{0}")]
    BusinessRule(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(vec![message.into()])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BusinessRule(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Validation(fields) => {
                tracing::warn!(?fields, "validation failure");
                json!({ "error": "validation failed", "fields": fields })
            }
            Self::Unauthorized => json!({ "error": "unauthorized" }),
            Self::Forbidden => json!({ "error": "forbidden" }),
            Self::NotFound(msg) | Self::Conflict(msg) | Self::BusinessRule(msg) => {
                tracing::warn!(status = status.as_u16(), error = %msg, "request rejected");
                json!({ "error": msg })
            }
            Self::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                json!({ "error": "internal server error" })
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

/// RepositoryError
///
/// Storage-level failures. Unique-index violations are kept distinct so they surface
/// as conflicts rather than opaque internal errors.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::UniqueViolation(what) => Self::Conflict(what),
            other => Self::Internal(other.into()),
        }
    }
}

/// Renders a caught panic as the same opaque 500 body used for internal errors.
pub fn panic_response(_err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    tracing::error!("handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal server error" })),
    )
        .into_response()
}
