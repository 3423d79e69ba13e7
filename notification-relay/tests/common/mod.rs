#![allow(dead_code)]

use notification_relay::config::{FcmConfig, RelayConfig, ValidationMode};
use notification_relay::services::PushProvider;
use notification_relay::startup::Application;
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::RsaPrivateKey;
use serde_json::json;
use service_core::config::Config as CoreConfig;
use std::io::Write;
use std::sync::{Arc, OnceLock};
use tempfile::NamedTempFile;

pub const TEST_PROJECT_ID: &str = "relay-test";
pub const TEST_CLIENT_EMAIL: &str = "relay@relay-test.iam.gserviceaccount.com";
pub const TEST_KEY_ID: &str = "test-key-id";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn(provider: Arc<dyn PushProvider>) -> Self {
        Self::spawn_with(provider, ValidationMode::Passthrough).await
    }

    pub async fn spawn_with(provider: Arc<dyn PushProvider>, validation: ValidationMode) -> Self {
        let app = Application::build_with_provider(test_config(validation), provider)
            .await
            .expect("Failed to build test application");
        Self::start(app)
    }

    /// Spawn the real startup path: credential file plus FCM client.
    pub async fn spawn_fcm(config: RelayConfig) -> Self {
        let app = Application::build(config)
            .await
            .expect("Failed to build test application");
        Self::start(app)
    }

    fn start(app: Application) -> Self {
        let port = app.port();
        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        TestApp {
            address: format!("http://127.0.0.1:{}", port),
            port,
            client: reqwest::Client::new(),
        }
    }

    /// Post an exact body string, for payloads `serde_json::Value` cannot express.
    pub async fn post_raw(&self, content_type: &str, body: &'static str) -> reqwest::Response {
        self.client
            .post(format!("{}/send-notification", self.address))
            .header("content-type", content_type)
            .body(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post_notification(&self, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}/send-notification", self.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }
}

pub fn test_config(validation: ValidationMode) -> RelayConfig {
    RelayConfig {
        common: CoreConfig { port: 0 },
        fcm: FcmConfig::default(),
        validation,
        log_level: "info".to_string(),
        otlp_endpoint: None,
    }
}

pub struct TestKeys {
    pub private_pem: String,
    pub public_pem: String,
}

/// RSA key pair shared by every test in the binary; generation is slow.
pub fn test_keys() -> &'static TestKeys {
    static KEYS: OnceLock<TestKeys> = OnceLock::new();
    KEYS.get_or_init(|| {
        let key = RsaPrivateKey::new(&mut rand::thread_rng(), 2048)
            .expect("Failed to generate RSA key");
        TestKeys {
            private_pem: key
                .to_pkcs8_pem(LineEnding::LF)
                .expect("Failed to encode private key")
                .as_str()
                .to_owned(),
            public_pem: key
                .to_public_key()
                .to_public_key_pem(LineEnding::LF)
                .expect("Failed to encode public key"),
        }
    })
}

/// Write a service-account key whose token endpoint is `token_uri`.
pub fn write_credential_file(token_uri: &str) -> NamedTempFile {
    let key = json!({
        "type": "service_account",
        "project_id": TEST_PROJECT_ID,
        "private_key_id": TEST_KEY_ID,
        "private_key": test_keys().private_pem,
        "client_email": TEST_CLIENT_EMAIL,
        "token_uri": token_uri,
    });

    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(key.to_string().as_bytes())
        .expect("Failed to write credential file");
    file
}
