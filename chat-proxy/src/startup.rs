//! Application startup and lifecycle management.

use crate::config::{ProviderKind, ProxyConfig};
use crate::handlers::{
    chat::chat,
    health::{health_check, metrics_endpoint, readiness_check},
};
use crate::services::init_metrics;
use crate::services::providers::{
    groq::GroqProvider, mock::MockCompletionProvider, CompletionProvider, GenerationParams,
};
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{create_unkeyed_rate_limiter, rate_limit_middleware},
    tracing::request_id_middleware,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ProxyConfig,
    pub provider: Arc<dyn CompletionProvider>,
    pub params: GenerationParams,
}

impl AppState {
    pub fn new(config: ProxyConfig, provider: Arc<dyn CompletionProvider>) -> Self {
        let params = GenerationParams::from(&config.provider);
        Self {
            config,
            provider,
            params,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let mut chat_routes = Router::new().route("/api/chat", post(chat));

    let per_minute = state.config.rate_limit.requests_per_minute;
    if per_minute > 0 {
        chat_routes = chat_routes.layer(from_fn_with_state(
            create_unkeyed_rate_limiter(per_minute, 60),
            rate_limit_middleware,
        ));
    }

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_endpoint))
        .merge(chat_routes)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Build the configured completion provider.
pub fn provider_from_config(config: &ProxyConfig) -> Result<Arc<dyn CompletionProvider>, AppError> {
    let provider: Arc<dyn CompletionProvider> = match config.provider.kind {
        ProviderKind::Groq => Arc::new(GroqProvider::new(&config.provider).map_err(|e| {
            tracing::error!("Failed to initialise completion provider: {}", e);
            AppError::ConfigError(anyhow::anyhow!(e))
        })?),
        ProviderKind::Mock => {
            tracing::warn!("Using mock completion provider");
            Arc::new(MockCompletionProvider::new(true))
        }
    };
    Ok(provider)
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the provider named in the configuration.
    pub async fn build(config: ProxyConfig) -> Result<Self, AppError> {
        let provider = provider_from_config(&config)?;
        Self::build_with_provider(config, provider).await
    }

    /// Build the application around an explicit provider (port 0 = random port).
    pub async fn build_with_provider(
        config: ProxyConfig,
        provider: Arc<dyn CompletionProvider>,
    ) -> Result<Self, AppError> {
        init_metrics();

        tracing::info!(
            provider = provider.name(),
            model = %config.provider.model,
            "Initialized completion provider"
        );

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Chat proxy listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state: AppState::new(config, provider),
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until a shutdown signal arrives.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);

        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                std::io::Error::other(format!("HTTP server error: {}", e))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProviderConfig, RateLimitConfig};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn router(provider_healthy: bool) -> Router {
        let config = ProxyConfig {
            common: service_core::config::Config {
                port: 0,
                log_level: "debug".to_string(),
                otlp_endpoint: None,
            },
            provider: ProviderConfig {
                kind: ProviderKind::Mock,
                ..ProviderConfig::default()
            },
            rate_limit: RateLimitConfig {
                requests_per_minute: 0,
            },
        };
        let provider: Arc<dyn CompletionProvider> =
            Arc::new(MockCompletionProvider::new(provider_healthy));
        build_router(AppState::new(config, provider))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn ready_when_provider_is_healthy() {
        let (status, body) = get_json(router(true), "/ready").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
    }

    #[tokio::test]
    async fn unhealthy_provider_is_service_unavailable() {
        let (status, body) = get_json(router(false), "/ready").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "Service unavailable");
    }

    #[tokio::test]
    async fn health_names_the_provider() {
        let (status, body) = get_json(router(false), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["provider"], "mock");
    }
}
