//! The `/api/chat` relay.

use crate::prompts;
use crate::services::metrics::{record_completion, record_tokens};
use crate::startup::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use service_core::chat::{ChatCompletion, ChatMessage, ChatRequest, ChatTask};
use service_core::error::AppError;
use validator::Validate;

/// Prepend the task's system prompt and relay the conversation to the provider.
///
/// Every provider failure collapses into the same generic 500 body; the cause
/// is only logged.
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatCompletion>, AppError> {
    let Json(payload) = payload.map_err(|rejection| {
        tracing::warn!(error = %rejection.body_text(), "Rejected malformed chat request");
        AppError::BadRequest(anyhow::anyhow!("Invalid request body"))
    })?;
    payload.validate()?;

    let task = payload
        .task
        .as_deref()
        .and_then(ChatTask::match_label)
        .map(ChatTask::slug)
        .unwrap_or("default");
    let system_prompt = prompts::system_prompt(payload.task.as_deref());

    let mut messages = Vec::with_capacity(payload.messages.len() + 1);
    messages.push(ChatMessage::system(system_prompt));
    messages.extend(payload.messages);

    tracing::info!(
        task,
        provider = state.provider.name(),
        message_count = messages.len(),
        "Relaying chat request"
    );

    let completion = state
        .provider
        .complete(&messages, &state.params)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, task, provider = state.provider.name(), "Completion failed");
            record_completion(task, state.provider.name(), e.kind());
            AppError::UpstreamError(e.to_string())
        })?;

    record_completion(task, state.provider.name(), "ok");
    if let Some(usage) = &completion.usage {
        record_tokens(task, usage.prompt_tokens, usage.completion_tokens);
    }

    tracing::info!(
        task,
        choices = completion.choices.len(),
        total_tokens = completion.total_tokens().unwrap_or_default(),
        "Chat request completed"
    );

    Ok(Json(completion))
}
