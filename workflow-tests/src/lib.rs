//! Workflow test harness.
//!
//! Starts an in-process `chat-proxy` backed by the mock provider on a random
//! port and builds `chat-client` sessions pointed at it, so tests exercise the
//! full path: session, ledger, HTTP, prompt selection, provider and back.

use anyhow::{anyhow, Result};
use chat_client::config::ProxySettings;
use chat_client::ledger::{KeyValueStore, SharedLedger, UsageLedger, UsageLimits};
use chat_client::services::ProxyClient;
use chat_client::session::ChatSession;
use chat_proxy::config::{ProviderConfig, ProviderKind, ProxyConfig, RateLimitConfig};
use chat_proxy::services::providers::mock::MockCompletionProvider;
use chat_proxy::services::CompletionProvider;
use chat_proxy::startup::Application;
use std::sync::{Arc, Once};
use std::time::Duration;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,workflow_tests=debug,chat_client=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// A running proxy and the mock provider behind it.
pub struct ProxyHarness {
    pub base_url: String,
    pub provider: Arc<MockCompletionProvider>,
}

impl ProxyHarness {
    /// Start a proxy whose provider behaves like `provider`.
    /// A `requests_per_minute` of zero disables the proxy's rate limiter.
    pub async fn start(provider: MockCompletionProvider, requests_per_minute: u32) -> Result<Self> {
        init_tracing();

        let provider = Arc::new(provider);
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
                requests_per_minute,
            },
        };

        let dyn_provider: Arc<dyn CompletionProvider> = provider.clone();
        let app = Application::build_with_provider(config, dyn_provider)
            .await
            .map_err(|e| anyhow!("Failed to build chat-proxy: {}", e))?;
        let port = app.port();

        tokio::spawn(async move {
            let _ = app.run_until_stopped().await;
        });

        let base_url = format!("http://127.0.0.1:{}", port);
        wait_for_health(&base_url, Duration::from_secs(5)).await?;

        Ok(Self { base_url, provider })
    }

    /// A session talking to this proxy with a ledger on `store`.
    pub fn session(&self, store: Arc<dyn KeyValueStore>, limits: UsageLimits) -> Result<ChatSession> {
        let client = ProxyClient::new(ProxySettings {
            url: self.base_url.clone(),
            timeout_secs: Some(10),
        })
        .map_err(|e| anyhow!("Failed to build proxy client: {}", e))?;

        let ledger = SharedLedger::new(UsageLedger::load(store, limits));
        Ok(ChatSession::new(Arc::new(client), ledger))
    }
}

/// Poll `/health` until it answers 200 or the timeout passes.
pub async fn wait_for_health(base_url: &str, timeout: Duration) -> Result<()> {
    let url = format!("{}/health", base_url);
    let deadline = tokio::time::Instant::now() + timeout;

    let client = reqwest::Client::new();

    loop {
        if let Ok(response) = client.get(&url).send().await {
            if response.status().is_success() {
                tracing::debug!(url = %url, "chat-proxy is healthy");
                return Ok(());
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(anyhow!("chat-proxy at {} did not become healthy", base_url));
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
