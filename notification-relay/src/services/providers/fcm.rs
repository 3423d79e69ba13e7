use super::{ErrorCode, ProviderError, PushProvider};
use crate::config::FcmConfig;
use crate::models::ProviderMessage;
use crate::services::credentials::ServiceAccountKey;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use tokio::sync::Mutex;

const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh the access token this long before Google says it expires.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

pub struct FcmProvider {
    client: Client,
    project_id: String,
    client_email: String,
    private_key_id: Option<String>,
    token_uri: String,
    send_url: String,
    encoding_key: EncodingKey,
    access_token: Mutex<Option<AccessToken>>,
}

#[derive(Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) < self.expires_at
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    assertion: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Serialize)]
struct FcmRequest<'a> {
    message: &'a ProviderMessage,
}

#[derive(Debug, Deserialize)]
struct FcmResponse {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    details: Vec<GoogleErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorDetail {
    #[serde(rename = "@type", default)]
    type_url: String,
    #[serde(rename = "errorCode")]
    error_code: Option<String>,
}

impl GoogleError {
    /// Prefer the FCM-specific code from `details` over the generic status.
    fn error_code(&self) -> ErrorCode {
        let fcm_code = self
            .details
            .iter()
            .find(|d| d.type_url.ends_with("google.firebase.fcm.v1.FcmError"))
            .and_then(|d| d.error_code.as_deref());

        match ErrorCode::from_fcm(fcm_code.unwrap_or(self.status.as_str())) {
            ErrorCode::InvalidArgument if self.message.contains("registration token") => {
                ErrorCode::InvalidRegistrationToken
            }
            code => code,
        }
    }
}

impl FcmProvider {
    pub fn new(key: &ServiceAccountKey, config: &FcmConfig) -> Result<Self, AppError> {
        let encoding_key = key.encoding_key()?;
        let send_url = format!(
            "{}/v1/projects/{}/messages:send",
            config.api_base_url.trim_end_matches('/'),
            key.project_id
        );

        Ok(Self {
            client: Client::new(),
            project_id: key.project_id.clone(),
            client_email: key.client_email.clone(),
            private_key_id: key.private_key_id.clone(),
            token_uri: key.token_uri.clone(),
            send_url,
            encoding_key,
            access_token: Mutex::new(None),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn sign_assertion(&self, now: DateTime<Utc>) -> Result<String, ProviderError> {
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: FCM_SCOPE,
            aud: &self.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        encode(&header, &claims, &self.encoding_key).map_err(|e| {
            ProviderError::Authentication(format!("Failed to sign token assertion: {}", e))
        })
    }

    /// Return a cached OAuth2 token, exchanging a fresh assertion when needed.
    /// The cache lock is held only to read or store, never across the exchange.
    async fn get_access_token(&self) -> Result<String, ProviderError> {
        let now = Utc::now();
        let cached = {
            let guard = self.access_token.lock().await;
            guard
                .as_ref()
                .filter(|t| t.is_fresh(now))
                .map(|t| t.value.clone())
        };
        if let Some(value) = cached {
            return Ok(value);
        }

        let access_token = self.exchange_assertion(now).await?;
        let value = access_token.value.clone();
        *self.access_token.lock().await = Some(access_token);

        Ok(value)
    }

    async fn exchange_assertion(&self, now: DateTime<Utc>) -> Result<AccessToken, ProviderError> {
        let assertion = self.sign_assertion(now)?;
        let response = self
            .client
            .post(&self.token_uri)
            .form(&TokenRequest {
                grant_type: JWT_BEARER_GRANT,
                assertion: &assertion,
            })
            .send()
            .await
            .map_err(|e| {
                ProviderError::Connection(format!("Failed to reach token endpoint: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Authentication(format!(
                "Token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            ProviderError::Authentication(format!("Failed to parse token response: {}", e))
        })?;

        tracing::debug!(expires_in = token.expires_in, "Obtained FCM access token");

        Ok(AccessToken {
            expires_at: token_expiry(now, token.expires_in)?,
            value: token.access_token,
        })
    }
}

/// `expires_in` comes from the network; out-of-range lifetimes are an error.
fn token_expiry(now: DateTime<Utc>, expires_in: i64) -> Result<DateTime<Utc>, ProviderError> {
    Duration::try_seconds(expires_in)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| {
            ProviderError::InvalidResponse(format!(
                "Token endpoint returned an out-of-range expires_in: {}",
                expires_in
            ))
        })
}

#[async_trait]
impl PushProvider for FcmProvider {
    async fn send(&self, message: &ProviderMessage) -> Result<String, ProviderError> {
        let access_token = self.get_access_token().await?;

        let response = self
            .client
            .post(&self.send_url)
            .bearer_auth(&access_token)
            .json(&FcmRequest { message })
            .send()
            .await
            .map_err(|e| ProviderError::Connection(format!("Failed to connect to FCM: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<GoogleErrorEnvelope>(&body) {
                Ok(envelope) => ProviderError::Rejected {
                    code: envelope.error.error_code(),
                    message: envelope.error.message,
                },
                Err(_) => ProviderError::Rejected {
                    code: ErrorCode::Unknown,
                    message: format!("FCM returned {}: {}", status, body),
                },
            });
        }

        let fcm_response: FcmResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse FCM response: {}", e))
        })?;

        Ok(fcm_response.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: serde_json::Value) -> GoogleError {
        serde_json::from_value::<GoogleErrorEnvelope>(body)
            .unwrap()
            .error
    }

    #[test]
    fn prefers_fcm_error_detail_over_status() {
        let error = parse(json!({
            "error": {
                "code": 404,
                "message": "Requested entity was not found.",
                "status": "NOT_FOUND",
                "details": [{
                    "@type": "type.googleapis.com/google.firebase.fcm.v1.FcmError",
                    "errorCode": "UNREGISTERED"
                }]
            }
        }));
        assert_eq!(error.error_code(), ErrorCode::RegistrationTokenNotRegistered);
    }

    #[test]
    fn recognises_invalid_registration_tokens() {
        let error = parse(json!({
            "error": {
                "code": 400,
                "message": "The registration token is not a valid FCM registration token",
                "status": "INVALID_ARGUMENT"
            }
        }));
        assert_eq!(error.error_code(), ErrorCode::InvalidRegistrationToken);
    }

    #[test]
    fn falls_back_to_status() {
        let error = parse(json!({
            "error": { "code": 503, "message": "down", "status": "UNAVAILABLE" }
        }));
        assert_eq!(error.error_code(), ErrorCode::ServerUnavailable);
    }

    #[test]
    fn tokens_expire_ahead_of_time() {
        let now = Utc::now();
        let token = AccessToken {
            value: "t".to_string(),
            expires_at: now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS - 1),
        };
        assert!(!token.is_fresh(now));

        let token = AccessToken {
            value: "t".to_string(),
            expires_at: now + Duration::seconds(3600),
        };
        assert!(token.is_fresh(now));
    }

    #[test]
    fn token_expiry_adds_the_lifetime() {
        let now = Utc::now();
        assert_eq!(
            token_expiry(now, 3599).unwrap(),
            now + Duration::seconds(3599)
        );
    }

    #[test]
    fn out_of_range_lifetimes_are_invalid_responses() {
        let now = Utc::now();
        for expires_in in [i64::MAX, i64::MIN] {
            let err = token_expiry(now, expires_in).unwrap_err();
            assert!(matches!(err, ProviderError::InvalidResponse(_)));
        }
    }
}
