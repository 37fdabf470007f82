//! OpenAI-compatible chat completions provider.
//!
//! Targets Groq by default; any endpoint speaking the same
//! `POST {base}/chat/completions` contract works.

use super::{CompletionProvider, GenerationParams, ProviderError};
use crate::config::ProviderConfig;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use service_core::chat::{ChatCompletion, ChatMessage};
use service_core::observability::TracedClientExt;
use std::time::Duration;

pub struct GroqProvider {
    base_url: String,
    api_key: Secret<String>,
    client: Client,
}

impl GroqProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            client,
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl CompletionProvider for GroqProvider {
    fn name(&self) -> &'static str {
        "groq"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<ChatCompletion, ProviderError> {
        if self.api_key.expose_secret().is_empty() {
            return Err(ProviderError::NotConfigured(
                "completion API key not configured".to_string(),
            ));
        }

        let request = CompletionRequest {
            model: &params.model,
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        tracing::debug!(
            model = %params.model,
            message_count = messages.len(),
            "Sending request to completion API"
        );

        let response = self
            .client
            .traced_post(&self.api_url("chat/completions"))
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited);
            }

            return Err(ProviderError::ApiError(format!(
                "completion API error {}: {}",
                status, error_text
            )));
        }

        response
            .json::<ChatCompletion>()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.api_key.expose_secret().is_empty() {
            return Err(ProviderError::NotConfigured(
                "completion API key not configured".to_string(),
            ));
        }

        let response = self
            .client
            .traced_get(&self.api_url("models"))
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProviderError::ApiError(format!(
                "Health check failed: {}",
                response.status()
            )))
        }
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_openai_shape() {
        let messages = vec![ChatMessage::system("be brief"), ChatMessage::user("hi")];
        let request = CompletionRequest {
            model: "llama3-70b-8192",
            messages: &messages,
            temperature: Some(0.5),
            max_tokens: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama3-70b-8192");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["temperature"], 0.5);
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn api_url_strips_trailing_slash() {
        let provider = GroqProvider::new(&ProviderConfig {
            base_url: "http://localhost:9000/v1/".to_string(),
            ..ProviderConfig::default()
        })
        .unwrap();

        assert_eq!(
            provider.api_url("chat/completions"),
            "http://localhost:9000/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn missing_api_key_is_not_configured() {
        let provider = GroqProvider::new(&ProviderConfig::default()).unwrap();
        let params = GenerationParams::from(&ProviderConfig::default());

        let err = provider
            .complete(&[ChatMessage::user("hi")], &params)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }
}
