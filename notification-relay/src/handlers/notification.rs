use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
};
use bytes::Bytes;
use validator::Validate;

use crate::config::ValidationMode;
use crate::error::{RelayError, SUCCESS_TEXT};
use crate::models::{NotificationRequest, ProviderMessage};
use crate::startup::AppState;

/// `POST /send-notification`: forward one notification to the push provider.
#[tracing::instrument(skip(state, headers, body))]
pub async fn send_notification(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), RelayError> {
    let request = parse_request(&headers, &body)?;

    if state.config.validation == ValidationMode::Strict {
        request.validate().map_err(|e| {
            tracing::warn!(error = %e, "Rejected notification request");
            e
        })?;
    }

    let message = ProviderMessage::from(request);

    match state.push_provider.send(&message).await {
        Ok(message_id) => {
            tracing::info!(message_id = %message_id, "Successfully sent message");
            Ok((StatusCode::OK, SUCCESS_TEXT))
        }
        Err(e) => {
            tracing::error!(error = %e, code = e.code(), "Error sending message");
            Err(RelayError::Delivery(e))
        }
    }
}

/// Non-JSON and empty bodies read as an empty request. Broken JSON and
/// scalar roots are a 400; field values are never inspected.
fn parse_request(headers: &HeaderMap, body: &[u8]) -> Result<NotificationRequest, RelayError> {
    if !is_json_content(headers) || body.iter().all(u8::is_ascii_whitespace) {
        return Ok(NotificationRequest::default());
    }

    let value: serde_json::Value = serde_json::from_slice(body).map_err(|e| {
        tracing::warn!(error = %e, "Malformed notification body");
        RelayError::InvalidRequest(e.to_string())
    })?;

    NotificationRequest::from_json(value).ok_or_else(|| {
        tracing::warn!("Notification body is not a JSON object");
        RelayError::InvalidRequest("body must be a JSON object or array".to_string())
    })
}

fn is_json_content(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json"
                || (mime.starts_with("application/") && mime.ends_with("+json"))
        })
        .unwrap_or(false)
}
