/// Error types for matching-service
///
/// `AppError` is the HTTP boundary: every handler returns it and it renders
/// as `{"error": <message>, "status": <code>}`. Lower layers keep their own
/// `thiserror` enums and are converted here.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};

use crate::db::StoreError;
use crate::services::ReconcileError;

/// Result type for handler operations
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or invalid credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but lacking the required role
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{0}")]
    Database(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        HttpResponse::build(status).json(serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }))
    }
}

impl From<ReconcileError> for AppError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::AlreadyRunning => AppError::Conflict(err.to_string()),
            ReconcileError::Fetch(source) => AppError::Database(source),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::Unauthorized("x".into()), 401),
            (AppError::Forbidden("x".into()), 403),
            (AppError::Validation("x".into()), 400),
            (AppError::Conflict("x".into()), 409),
            (AppError::Database(StoreError::Missing("x".into())), 500),
            (AppError::Internal("x".into()), 500),
        ];

        for (err, expected) in cases {
            assert_eq!(err.status_code().as_u16(), expected, "{}", err);
        }
    }

    #[test]
    fn test_reconcile_error_mapping() {
        let busy: AppError = ReconcileError::AlreadyRunning.into();
        assert_eq!(busy.status_code(), StatusCode::CONFLICT);

        let fetch: AppError =
            ReconcileError::Fetch(StoreError::Unavailable("down".into())).into();
        assert_eq!(fetch.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(fetch.to_string(), "Store unavailable: down");
    }

    #[actix_web::test]
    async fn test_error_body_shape() {
        let resp = AppError::Validation("jobId is required".into()).error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], 400);
        assert_eq!(json["error"], "Validation error: jobId is required");
    }
}
