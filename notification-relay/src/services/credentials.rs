use jsonwebtoken::EncodingKey;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use service_core::error::AppError;
use std::fs;
use std::path::Path;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const SERVICE_ACCOUNT_TYPE: &str = "service_account";

/// Google service-account key, as downloaded from the Firebase console.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub key_type: Option<String>,
    pub project_id: String,
    pub private_key_id: Option<String>,
    pub private_key: Secret<String>,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    /// Read and check the key file. Every failure here is fatal to startup.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            AppError::CredentialError(anyhow::anyhow!(
                "Failed to read service account key from {}: {}",
                path.display(),
                e
            ))
        })?;

        let key = Self::from_json(&raw).map_err(|e| match e {
            AppError::CredentialError(err) => AppError::CredentialError(err.context(format!(
                "Invalid service account key in {}",
                path.display()
            ))),
            other => other,
        })?;

        tracing::info!(
            project_id = %key.project_id,
            client_email = %key.client_email,
            "Loaded service account credential"
        );

        Ok(key)
    }

    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        let key: ServiceAccountKey = serde_json::from_str(raw).map_err(|e| {
            AppError::CredentialError(anyhow::anyhow!("Failed to parse service account key: {}", e))
        })?;

        if let Some(key_type) = key.key_type.as_deref() {
            if key_type != SERVICE_ACCOUNT_TYPE {
                return Err(AppError::CredentialError(anyhow::anyhow!(
                    "Unexpected credential type '{}', expected '{}'",
                    key_type,
                    SERVICE_ACCOUNT_TYPE
                )));
            }
        }

        if key.project_id.trim().is_empty() {
            return Err(AppError::CredentialError(anyhow::anyhow!(
                "Service account key has an empty project_id"
            )));
        }

        if key.client_email.trim().is_empty() {
            return Err(AppError::CredentialError(anyhow::anyhow!(
                "Service account key has an empty client_email"
            )));
        }

        // Parse once up front so a broken key never reaches the first request.
        key.encoding_key()?;

        Ok(key)
    }

    pub fn encoding_key(&self) -> Result<EncodingKey, AppError> {
        EncodingKey::from_rsa_pem(self.private_key.expose_secret().as_bytes()).map_err(|e| {
            AppError::CredentialError(anyhow::anyhow!("Failed to parse private key: {}", e))
        })
    }
}
