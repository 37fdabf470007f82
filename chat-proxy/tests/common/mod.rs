//! Shared helpers for chat-proxy integration tests.

use chat_proxy::config::{ProviderConfig, ProviderKind, ProxyConfig, RateLimitConfig};
use chat_proxy::services::providers::{mock::MockCompletionProvider, CompletionProvider};
use chat_proxy::startup::Application;
use std::sync::Arc;
use std::time::Duration;

pub fn test_config(requests_per_minute: u32) -> ProxyConfig {
    ProxyConfig {
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
            requests_per_minute,
        },
    }
}

/// Spawn the proxy on a random port around `provider` and return its base URL.
pub async fn spawn_app_with(provider: Arc<MockCompletionProvider>, requests_per_minute: u32) -> String {
    let provider: Arc<dyn CompletionProvider> = provider;
    let app = Application::build_with_provider(test_config(requests_per_minute), provider)
        .await
        .expect("Failed to build application");

    let port = app.port();

    tokio::spawn(async move {
        let _ = app.run_until_stopped().await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("http://127.0.0.1:{}", port)
}
