use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use slotbook_core::BookingError;

#[derive(Debug)]
pub enum AppError {
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    UnprocessableError(String),
    BadGateway(String),
    ServiceUnavailable(String),
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::UnprocessableError(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::BadGateway(msg) => {
                tracing::error!("Upstream failure: {}", msg);
                (StatusCode::BAD_GATEWAY, "Payment provider unavailable".to_string())
            }
            AppError::ServiceUnavailable(msg) => {
                tracing::error!("Service unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "Service temporarily unavailable".to_string())
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::SlotUnavailable | BookingError::SlotConflict => {
                AppError::ConflictError(BookingError::SlotConflict.to_string())
            }
            BookingError::NotHolder | BookingError::NotOwner => AppError::AuthorizationError(err.to_string()),
            BookingError::DateNotBookable(_) | BookingError::InvalidContent(_) => {
                AppError::UnprocessableError(err.to_string())
            }
            BookingError::InvalidSignature | BookingError::InvalidPayload(_) => {
                AppError::ValidationError(err.to_string())
            }
            BookingError::TierNotFound(_) | BookingError::BookingNotFound(_) => {
                AppError::NotFoundError(err.to_string())
            }
            BookingError::InvalidTransition { .. } => AppError::ConflictError(err.to_string()),
            BookingError::Payment(msg) => AppError::BadGateway(msg),
            BookingError::StoreUnavailable(msg) => AppError::ServiceUnavailable(msg),
        }
    }
}
