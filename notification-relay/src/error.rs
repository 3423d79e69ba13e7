use crate::services::ProviderError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

pub const SUCCESS_TEXT: &str = "Notification sent successfully";
pub const DELIVERY_FAILED_TEXT: &str = "Error sending notification";
pub const INVALID_REQUEST_TEXT: &str = "Invalid notification request";

/// Request-level failures of `POST /send-notification`.
///
/// Callers only ever see a fixed plain-text body; the detail goes to the log.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid notification request: {0}")]
    InvalidRequest(String),

    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Delivery failed: {0}")]
    Delivery(#[from] ProviderError),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            RelayError::InvalidRequest(_) | RelayError::ValidationError(_) => {
                (StatusCode::BAD_REQUEST, INVALID_REQUEST_TEXT).into_response()
            }
            RelayError::Delivery(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, DELIVERY_FAILED_TEXT).into_response()
            }
        }
    }
}
