//! Mock provider for tests and offline development.

use super::{CompletionProvider, GenerationParams, ProviderError};
use async_trait::async_trait;
use service_core::chat::{
    ChatCompletion, ChatMessage, ChatRole, Choice, CompletionMessage, Usage,
};
use std::sync::Mutex;

/// Mock completion provider.
///
/// Answers with a scripted reply (or an echo of the last user message) and
/// keeps every message list it receives so tests can inspect what the proxy
/// relayed.
pub struct MockCompletionProvider {
    enabled: bool,
    reply: Option<String>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockCompletionProvider {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            reply: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A provider that always answers with `reply`.
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            ..Self::new(true)
        }
    }

    /// Message lists received so far, oldest first.
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<ChatCompletion, ProviderError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }

        if !self.enabled {
            return Err(ProviderError::NotConfigured(
                "Mock provider not enabled".to_string(),
            ));
        }

        let content = self.reply.clone().unwrap_or_else(|| {
            let last_user = messages
                .iter()
                .rev()
                .find(|m| m.role == ChatRole::User)
                .map(|m| m.content.as_str())
                .unwrap_or_default();
            format!("Mock response for: {}", last_user)
        });

        let prompt_tokens = messages.iter().map(|m| m.content.len() as u64).sum::<u64>() / 4;
        let completion_tokens = content.len() as u64 / 4;

        Ok(ChatCompletion {
            id: format!("mock-{}", self.calls().len()),
            object: "chat.completion".to_string(),
            created: 0,
            model: params.model.clone(),
            choices: vec![Choice {
                index: 0,
                message: CompletionMessage {
                    role: "assistant".to_string(),
                    content: Some(content),
                },
                finish_reason: Some("stop".to_string()),
            }],
            usage: Some(Usage {
                prompt_tokens,
                completion_tokens,
                total_tokens: Some(prompt_tokens + completion_tokens),
            }),
        })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.enabled {
            Ok(())
        } else {
            Err(ProviderError::NotConfigured(
                "Mock provider not enabled".to_string(),
            ))
        }
    }
}
