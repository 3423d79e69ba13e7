use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

pub const DEFAULT_CREDENTIALS_PATH: &str = "service-account-key.json";
pub const DEFAULT_FCM_API_BASE_URL: &str = "https://fcm.googleapis.com";

/// Assembled by [`RelayConfig::load`] from the environment.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub common: core_config::Config,
    pub fcm: FcmConfig,
    pub validation: ValidationMode,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FcmConfig {
    /// Path to the Google service-account JSON key.
    pub credentials_path: String,
    pub api_base_url: String,
}

impl Default for FcmConfig {
    fn default() -> Self {
        Self {
            credentials_path: DEFAULT_CREDENTIALS_PATH.to_string(),
            api_base_url: DEFAULT_FCM_API_BASE_URL.to_string(),
        }
    }
}

/// How much checking the relay does before handing a request to the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationMode {
    /// Forward whatever arrived, absent fields included.
    #[default]
    Passthrough,
    /// Require a non-empty token, title and body.
    Strict,
}

impl FromStr for ValidationMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "passthrough" => Ok(ValidationMode::Passthrough),
            "strict" => Ok(ValidationMode::Strict),
            other => Err(AppError::ConfigError(anyhow::anyhow!(
                "RELAY_VALIDATION_MODE must be 'passthrough' or 'strict', got '{}'",
                other
            ))),
        }
    }
}

impl RelayConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(RelayConfig {
            common: common_config,
            fcm: FcmConfig {
                credentials_path: get_env(
                    "FCM_CREDENTIALS_PATH",
                    Some(DEFAULT_CREDENTIALS_PATH),
                    is_prod,
                )?,
                api_base_url: env::var("FCM_API_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_FCM_API_BASE_URL.to_string()),
            },
            validation: env::var("RELAY_VALIDATION_MODE")
                .map(|v| v.parse())
                .unwrap_or(Ok(ValidationMode::Passthrough))?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|v| !v.is_empty()),
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}
