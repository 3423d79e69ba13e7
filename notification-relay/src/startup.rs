//! Application startup and lifecycle management.
//!
//! The push provider is built once here and handed to the router as shared
//! state, so tests can swap in a [`MockPushProvider`](crate::services::MockPushProvider).

use crate::config::RelayConfig;
use crate::handlers::send_notification;
use crate::services::{FcmProvider, PushProvider, ServiceAccountKey};
use axum::{extract::DefaultBodyLimit, middleware::from_fn, routing::post, Router};
use service_core::error::AppError;
use service_core::middleware::{http_trace_layer, request_id_middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 100 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: RelayConfig,
    pub push_provider: Arc<dyn PushProvider>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/send-notification", post(send_notification))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(http_trace_layer())
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the FCM provider described by `config`.
    ///
    /// A missing or unusable credential file fails here, before the port is bound.
    pub async fn build(config: RelayConfig) -> Result<Self, AppError> {
        let key = ServiceAccountKey::from_file(&config.fcm.credentials_path).map_err(|e| {
            tracing::error!("Failed to load FCM credential: {}", e);
            e
        })?;

        let provider = FcmProvider::new(&key, &config.fcm)?;
        tracing::info!(project_id = %provider.project_id(), "FCM push provider initialized");

        Self::build_with_provider(config, Arc::new(provider)).await
    }

    /// Build the application around an already constructed provider.
    pub async fn build_with_provider(
        config: RelayConfig,
        push_provider: Arc<dyn PushProvider>,
    ) -> Result<Self, AppError> {
        // Port 0 = random port for testing
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Server running on port {}", port);

        Ok(Self {
            port,
            listener,
            state: AppState {
                config,
                push_provider,
            },
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve requests until Ctrl+C or SIGTERM.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, router(self.state))
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
