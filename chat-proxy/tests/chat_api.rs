//! `/api/chat` behaviour against the mock provider.

mod common;

use chat_proxy::prompts::{DEFAULT_PROMPT, MAINTENANCE_PROMPT};
use chat_proxy::services::providers::mock::MockCompletionProvider;
use reqwest::{Client, StatusCode};
use serde_json::json;
use service_core::chat::ChatRole;
use std::sync::Arc;

#[tokio::test]
async fn chat_prepends_task_prompt_and_relays_completion() {
    let provider = Arc::new(MockCompletionProvider::with_reply("```vba\nSub Hello()\nEnd Sub\n```"));
    let base = common::spawn_app_with(provider.clone(), 0).await;

    let response = Client::new()
        .post(format!("{}/api/chat", base))
        .json(&json!({
            "messages": [{ "role": "user", "content": "[Task: Manutenção de Macro] fix my loop" }],
            "task": "Manutenção de Macro"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(
        body["choices"][0]["message"]["content"],
        "```vba\nSub Hello()\nEnd Sub\n```"
    );
    assert!(body["usage"]["total_tokens"].as_u64().unwrap() > 0);

    let calls = provider.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].len(), 2);
    assert_eq!(calls[0][0].role, ChatRole::System);
    assert_eq!(calls[0][0].content, MAINTENANCE_PROMPT);
    assert_eq!(calls[0][1].content, "[Task: Manutenção de Macro] fix my loop");
}

#[tokio::test]
async fn missing_task_falls_back_to_default_prompt() {
    let provider = Arc::new(MockCompletionProvider::new(true));
    let base = common::spawn_app_with(provider.clone(), 0).await;

    let response = Client::new()
        .post(format!("{}/api/chat", base))
        .json(&json!({ "messages": [{ "role": "user", "content": "hello" }] }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["choices"][0]["message"]["content"], "Mock response for: hello");
    assert_eq!(provider.calls()[0][0].content, DEFAULT_PROMPT);
}

#[tokio::test]
async fn provider_failure_returns_generic_error() {
    let base = common::spawn_app_with(Arc::new(MockCompletionProvider::new(false)), 0).await;

    let response = Client::new()
        .post(format!("{}/api/chat", base))
        .json(&json!({ "messages": [{ "role": "user", "content": "hello" }], "task": null }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Error processing request" }));
}

#[tokio::test]
async fn malformed_body_is_rejected_without_calling_provider() {
    let provider = Arc::new(MockCompletionProvider::new(true));
    let base = common::spawn_app_with(provider.clone(), 0).await;

    let response = Client::new()
        .post(format!("{}/api/chat", base))
        .header("content-type", "application/json")
        .body("{\"messages\": \"nope\"}")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn empty_message_list_fails_validation() {
    let provider = Arc::new(MockCompletionProvider::new(true));
    let base = common::spawn_app_with(provider.clone(), 0).await;

    let response = Client::new()
        .post(format!("{}/api/chat", base))
        .json(&json!({ "messages": [] }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn rate_limit_rejects_excess_requests() {
    let provider = Arc::new(MockCompletionProvider::new(true));
    let base = common::spawn_app_with(provider.clone(), 2).await;
    let client = Client::new();
    let body = json!({ "messages": [{ "role": "user", "content": "hi" }] });

    for _ in 0..2 {
        let response = client
            .post(format!("{}/api/chat", base))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = client
        .post(format!("{}/api/chat", base))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(provider.calls().len(), 2);

    // Health checks are outside the limiter.
    let response = client.get(format!("{}/health", base)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
