//! # HTTP Errors
//!
//! Maps storage errors onto status codes and the JSON error body clients
//! receive: `{"code": 404, "error": "...", "message": "..."}`.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use derive_more::Display;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use dialysis_core::AppError;
use serde::Serialize;

/// An error ready to be rendered as an HTTP response.
#[derive(Debug, Display)]
#[display("{message}: {error}")]
pub struct ApiError {
    status: StatusCode,
    error: String,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: u16,
    error: &'a str,
    message: &'a str,
}

impl ApiError {
    /// Wraps a storage error, labelled with the operation that failed.
    pub fn new(err: AppError, message: impl Into<String>) -> Self {
        Self {
            status: status_for(&err),
            error: err.to_string(),
            message: message.into(),
        }
    }

    /// An error with an explicit status.
    pub fn with_status(
        status: StatusCode,
        error: impl ToString,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            error: error.to_string(),
            message: message.into(),
        }
    }

    /// A 400 response.
    pub fn bad_request(error: impl ToString, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, error, message)
    }

    /// The status this error renders with.
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// Status code for a storage error.
pub fn status_for(err: &AppError) -> StatusCode {
    match err {
        AppError::NotFound(_) | AppError::Database(DieselError::NotFound) => StatusCode::NOT_FOUND,
        AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        AppError::Database(DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation | DatabaseErrorKind::ForeignKeyViolation,
            _,
        )) => StatusCode::CONFLICT,
        AppError::Database(DieselError::DatabaseError(DatabaseErrorKind::CheckViolation, _)) => {
            StatusCode::BAD_REQUEST
        }
        AppError::Pool(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.error, "{}", self.message);
        } else {
            tracing::debug!(status = %self.status, error = %self.error, "{}", self.message);
        }
        HttpResponse::build(self.status).json(ErrorBody {
            code: self.status.as_u16(),
            error: &self.error,
            message: &self.message,
        })
    }
}

/// Attaches an operation label to storage results.
pub trait Context<T> {
    /// Converts the error into an [`ApiError`] labelled `message`.
    fn context(self, message: impl Into<String>) -> Result<T, ApiError>;
}

impl<T> Context<T> for Result<T, AppError> {
    fn context(self, message: impl Into<String>) -> Result<T, ApiError> {
        self.map_err(|err| ApiError::new(err, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&AppError::NotFound("Post 1".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&AppError::Database(DieselError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&AppError::BadRequest("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&AppError::PayloadTooLarge("x".into())),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            status_for(&AppError::General("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unique_violation_is_conflict() {
        let err = AppError::Database(DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key".to_string()),
        ));
        assert_eq!(status_for(&err), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn test_error_body() {
        let err = ApiError::new(AppError::NotFound("Patient 4".into()), "Failed to fetch patient");
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "code": 404,
                "error": "Patient 4 not found",
                "message": "Failed to fetch patient"
            })
        );
    }
}
