use crate::middleware::error_handling;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;
use uuid::Uuid;

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        error_handling::into_response(self.clone())
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Service-level error, rendered as a structured JSON body by the HTTP layer.
#[derive(Debug, Error, Clone)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server start failure: {0}")]
    StartServer(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    UserNotFound(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("internal server error")]
    Internal,
}

impl AppError {
    /// Returns HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::BadRequest(_) => 400,
            AppError::Unauthorized(_) => 401,
            AppError::Forbidden(_) => 403,
            AppError::UserNotFound(_) => 404,
            AppError::ServiceUnavailable(_) => 503,
            AppError::Config(_)
            | AppError::StartServer(_)
            | AppError::Database(_)
            | AppError::Internal => 500,
        }
    }
}

/// Failures of the message store and its storage backends.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),

    #[error("user {0} not found")]
    UserNotFound(Uuid),

    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Persistence(e.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match &e {
            StoreError::Validation(msg) => AppError::BadRequest(msg.clone()),
            StoreError::UserNotFound(_) => AppError::UserNotFound(e.to_string()),
            StoreError::Persistence(msg) => AppError::Database(msg.clone()),
        }
    }
}

/// Outcome of verifying a bearer credential.
#[derive(Debug, Error, Clone)]
pub enum IdentityError {
    #[error("invalid credential: {0}")]
    Invalid(String),

    #[error("identity verification unavailable: {0}")]
    Unavailable(String),
}

impl From<IdentityError> for AppError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::Invalid(_) => AppError::Unauthorized("Invalid credential".into()),
            IdentityError::Unavailable(msg) => AppError::ServiceUnavailable(msg),
        }
    }
}

/// Errors reported by the live gateway. The display string is what the
/// originating connection sees in its `error` event, so it never carries
/// storage internals.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("{0}")]
    AuthenticationFailed(String),

    #[error("{0}")]
    AuthorizationDenied(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Persistence(String),

    #[error("{0}")]
    NotFound(String),
}

impl GatewayError {
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::AuthenticationFailed(_) => "AUTHENTICATION_FAILED",
            GatewayError::AuthorizationDenied(_) => "AUTHORIZATION_DENIED",
            GatewayError::Validation(_) => "VALIDATION_ERROR",
            GatewayError::Persistence(_) => "PERSISTENCE_ERROR",
            GatewayError::NotFound(_) => "NOT_FOUND",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::BadRequest("x".into()).status_code(), 400);
        assert_eq!(AppError::Unauthorized("x".into()).status_code(), 401);
        assert_eq!(AppError::Forbidden("x".into()).status_code(), 403);
        assert_eq!(AppError::UserNotFound("x".into()).status_code(), 404);
        assert_eq!(AppError::Database("x".into()).status_code(), 500);
    }

    #[test]
    fn test_store_errors_map_to_http_families() {
        assert_eq!(
            AppError::from(StoreError::Validation("content is required".into())).status_code(),
            400
        );
        assert_eq!(
            AppError::from(StoreError::Persistence("down".into())).status_code(),
            500
        );
        assert_eq!(
            AppError::from(StoreError::UserNotFound(Uuid::nil())).status_code(),
            404
        );
    }

    #[test]
    fn test_invalid_credential_never_echoes_reason() {
        let err = AppError::from(IdentityError::Invalid("signature mismatch".into()));
        assert_eq!(err.status_code(), 401);
        assert!(!err.to_string().contains("signature"));
    }

    #[test]
    fn test_gateway_error_codes_are_distinct() {
        let codes = [
            GatewayError::AuthenticationFailed(String::new()).code(),
            GatewayError::AuthorizationDenied(String::new()).code(),
            GatewayError::Validation(String::new()).code(),
            GatewayError::Persistence(String::new()).code(),
            GatewayError::NotFound(String::new()).code(),
        ];
        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }
}
