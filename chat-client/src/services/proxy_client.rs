use crate::config::ProxySettings;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use service_core::chat::{ChatCompletion, ChatRequest};
use service_core::observability::TracedClientExt;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("proxy returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("invalid completion payload: {0}")]
    Decode(String),
}

/// Anything that can turn a chat request into a completion.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, ClientError>;
}

/// Client for the chat proxy's `POST /api/chat`.
pub struct ProxyClient {
    client: Client,
    settings: ProxySettings,
}

impl ProxyClient {
    pub fn new(settings: ProxySettings) -> Result<Self, ClientError> {
        let mut builder = Client::builder();
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            settings,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.settings.url
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.settings.url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CompletionClient for ProxyClient {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, ClientError> {
        let url = self.chat_url();

        let response = self
            .client
            .traced_post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(url = %url, error = %e, "Failed to reach chat proxy");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }
}
