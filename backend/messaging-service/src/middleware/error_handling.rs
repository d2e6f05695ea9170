use crate::error::{AppError, GatewayError};
use actix_web::error::{JsonPayloadError, QueryPayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse};
use error_types::{error_codes, error_types as families, ErrorResponse};

pub fn map_error(err: &AppError) -> (StatusCode, ErrorResponse) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let (error_type, code) = match err {
        AppError::BadRequest(_) => (families::VALIDATION_ERROR, error_codes::VALIDATION_ERROR),
        AppError::Unauthorized(_) => (
            families::AUTHENTICATION_ERROR,
            error_codes::AUTHENTICATION_FAILED,
        ),
        AppError::Forbidden(_) => (
            families::AUTHORIZATION_ERROR,
            error_codes::NOT_CONVERSATION_PARTICIPANT,
        ),
        AppError::UserNotFound(_) => (families::NOT_FOUND_ERROR, error_codes::USER_NOT_FOUND),
        AppError::Database(_) => (families::SERVER_ERROR, error_codes::PERSISTENCE_ERROR),
        AppError::ServiceUnavailable(_) => {
            (families::SERVER_ERROR, error_codes::SERVICE_UNAVAILABLE)
        }
        AppError::Config(_) | AppError::StartServer(_) | AppError::Internal => {
            (families::SERVER_ERROR, error_codes::INTERNAL_SERVER_ERROR)
        }
    };

    // Server-side failures are logged, not echoed.
    let message = if status.is_server_error() {
        tracing::error!(error = %err, status = status.as_u16(), "request failed");
        "Internal server error".to_string()
    } else {
        err.to_string()
    };

    (
        status,
        ErrorResponse::new(code, &message, status.as_u16(), error_type),
    )
}

pub fn into_response(err: AppError) -> HttpResponse {
    let (status, body) = map_error(&err);
    HttpResponse::build(status).json(body)
}

/// 401 returned instead of upgrading when a live connection fails to authenticate.
pub fn gateway_rejection(err: &GatewayError) -> HttpResponse {
    match err {
        GatewayError::AuthenticationFailed(message) => HttpResponse::Unauthorized().json(
            ErrorResponse::new(
                error_codes::AUTHENTICATION_FAILED,
                message,
                StatusCode::UNAUTHORIZED.as_u16(),
                families::AUTHENTICATION_ERROR,
            ),
        ),
        other => into_response(AppError::Database(other.to_string())),
    }
}

pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    tracing::debug!(error = %err, "rejected JSON body");
    AppError::BadRequest(format!("Invalid request body: {err}")).into()
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(format!("Invalid query string: {err}")).into()
}
