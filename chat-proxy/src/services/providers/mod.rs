//! Completion provider abstractions and implementations.
//!
//! The proxy talks to its backend through [`CompletionProvider`] so the
//! hosted API can be swapped for the mock in tests and local development.

pub mod groq;
pub mod mock;

use crate::config::ProviderConfig;
use async_trait::async_trait;
use service_core::chat::{ChatCompletion, ChatMessage};
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Network error: {0}")]
    NetworkError(String),
}

impl ProviderError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::ApiError(_) => "api_error",
            ProviderError::InvalidResponse(_) => "invalid_response",
            ProviderError::RateLimited => "rate_limited",
            ProviderError::NetworkError(_) => "network_error",
        }
    }
}

/// Generation parameters for a completion request.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub model: String,

    /// Temperature (0.0 - 2.0).
    pub temperature: Option<f32>,

    /// Maximum output tokens.
    pub max_tokens: Option<u32>,
}

impl From<&ProviderConfig> for GenerationParams {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: Some(config.temperature),
            max_tokens: Some(config.max_tokens),
        }
    }
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name for logs and metrics.
    fn name(&self) -> &'static str;

    /// Run a chat completion over the full message list (system prompt included).
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<ChatCompletion, ProviderError>;

    async fn health_check(&self) -> Result<(), ProviderError>;
}
