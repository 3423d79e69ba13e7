pub mod fcm;
pub mod mock;

use crate::models::ProviderMessage;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub use fcm::FcmProvider;
pub use mock::{MockOutcome, MockPushProvider};

/// Provider-reported failure reasons, keyed on FCM's error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidArgument,
    RegistrationTokenNotRegistered,
    InvalidRegistrationToken,
    MismatchedCredential,
    MessageRateExceeded,
    ServerUnavailable,
    InternalError,
    ThirdPartyAuthError,
    Unknown,
}

impl ErrorCode {
    /// Map an FCM `errorCode` (or Google API `status`) to a code.
    pub fn from_fcm(code: &str) -> Self {
        match code {
            "INVALID_ARGUMENT" => ErrorCode::InvalidArgument,
            "UNREGISTERED" | "NOT_FOUND" => ErrorCode::RegistrationTokenNotRegistered,
            "SENDER_ID_MISMATCH" | "PERMISSION_DENIED" => ErrorCode::MismatchedCredential,
            "QUOTA_EXCEEDED" | "RESOURCE_EXHAUSTED" => ErrorCode::MessageRateExceeded,
            "UNAVAILABLE" => ErrorCode::ServerUnavailable,
            "INTERNAL" => ErrorCode::InternalError,
            "THIRD_PARTY_AUTH_ERROR" => ErrorCode::ThirdPartyAuthError,
            _ => ErrorCode::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "invalid-argument",
            ErrorCode::RegistrationTokenNotRegistered => "registration-token-not-registered",
            ErrorCode::InvalidRegistrationToken => "invalid-registration-token",
            ErrorCode::MismatchedCredential => "mismatched-credential",
            ErrorCode::MessageRateExceeded => "message-rate-exceeded",
            ErrorCode::ServerUnavailable => "server-unavailable",
            ErrorCode::InternalError => "internal-error",
            ErrorCode::ThirdPartyAuthError => "third-party-auth-error",
            ErrorCode::Unknown => "unknown-error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Provider rejected message ({code}): {message}")]
    Rejected { code: ErrorCode, message: String },

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Short machine-readable reason, for logs.
    pub fn code(&self) -> &'static str {
        match self {
            ProviderError::Authentication(_) => "authentication-error",
            ProviderError::Connection(_) => "connection-error",
            ProviderError::Rejected { code, .. } => code.as_str(),
            ProviderError::InvalidResponse(_) => "invalid-response",
        }
    }
}

/// An authenticated handle to a push-messaging service.
#[async_trait]
pub trait PushProvider: Send + Sync {
    /// Deliver one message, returning the provider-assigned message id.
    async fn send(&self, message: &ProviderMessage) -> Result<String, ProviderError>;
}
