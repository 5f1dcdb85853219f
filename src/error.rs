use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::state::session::SessionError;

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A reference table needed by the request could not be loaded.
    #[error("data unavailable: {0}")]
    DataUnavailable(String),
    /// No session cookie, or the session is unknown or anonymous.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<SessionError> for ServiceError {
    fn from(err: SessionError) -> Self {
        let message = err.to_string();
        match err {
            SessionError::EntityNotFound(_) => ServiceError::NotFound(message),
            SessionError::MissingInput(_) | SessionError::InvalidCell { .. } => {
                ServiceError::InvalidInput(message)
            }
            SessionError::DataUnavailable(_) => ServiceError::DataUnavailable(message),
            SessionError::AlreadyTerminal
            | SessionError::InvalidTransition(_)
            | SessionError::NotInGame(_)
            | SessionError::PuzzleCompleted => ServiceError::InvalidState(message),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::DataUnavailable(message) => AppError::ServiceUnavailable(message),
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        ServiceError::from(err).into()
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::session::GameKind;

    fn status(err: SessionError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn session_errors_map_to_http_statuses() {
        assert_eq!(
            status(SessionError::EntityNotFound("x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(SessionError::MissingInput("name")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(SessionError::InvalidCell { row: 4, col: 0 }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(SessionError::NotInGame(GameKind::MetroGuess)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(SessionError::DataUnavailable("stations")),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn service_errors_map_to_http_statuses() {
        let status = |err: ServiceError| AppError::from(err).into_response().status();
        assert_eq!(
            status(ServiceError::Unauthorized("login required".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(ServiceError::DataUnavailable("stations".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
