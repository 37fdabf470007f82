//! Prometheus metrics for the chat proxy.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Safe to call more than once; later calls
/// keep the first recorder.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
        }
        Err(e) => tracing::warn!(error = %e, "Prometheus recorder already installed"),
    }
}

pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Count a relayed completion by task and outcome.
pub fn record_completion(task: &str, provider: &str, outcome: &str) {
    counter!(
        "chat_completions_total",
        "task" => task.to_string(),
        "provider" => provider.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Count tokens reported by the provider.
pub fn record_tokens(task: &str, prompt_tokens: u64, completion_tokens: u64) {
    counter!("chat_tokens_total", "task" => task.to_string(), "type" => "prompt")
        .increment(prompt_tokens);
    counter!("chat_tokens_total", "task" => task.to_string(), "type" => "completion")
        .increment(completion_tokens);
}
