//! Outbound HTTP calls that carry the active span as a W3C `traceparent`.
//!
//! See: https://www.w3.org/TR/trace-context/

use opentelemetry::trace::{SpanContext, TraceContextExt};
use reqwest::header::HeaderMap;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub const TRACEPARENT_HEADER: &str = "traceparent";
const TRACESTATE_HEADER: &str = "tracestate";

/// Correlation id echoed by the request-id middleware.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// `version-trace_id-span_id-flags`, or `None` for an invalid context.
fn traceparent(context: &SpanContext) -> Option<String> {
    if !context.is_valid() {
        return None;
    }
    Some(format!(
        "00-{}-{}-{:02x}",
        context.trace_id(),
        context.span_id(),
        context.trace_flags().to_u8()
    ))
}

/// Trace headers for the current span. Empty when OTLP export is off.
pub fn trace_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    let context = Span::current().context();
    let span = context.span();
    let span_context = span.span_context();

    if let Some(value) = traceparent(span_context).and_then(|v| v.parse().ok()) {
        headers.insert(TRACEPARENT_HEADER, value);
    }

    let state = span_context.trace_state().header();
    if !state.is_empty()
        && let Ok(value) = state.parse()
    {
        headers.insert(TRACESTATE_HEADER, value);
    }
    headers
}

/// Request builder that attaches [`trace_headers`] when sent.
pub struct TracedRequest {
    request: reqwest::RequestBuilder,
}

impl TracedRequest {
    pub fn json<T: serde::Serialize + ?Sized>(self, body: &T) -> Self {
        Self {
            request: self.request.json(body),
        }
    }

    pub fn bearer_auth<T: std::fmt::Display>(self, token: T) -> Self {
        Self {
            request: self.request.bearer_auth(token),
        }
    }

    pub async fn send(self) -> Result<reqwest::Response, reqwest::Error> {
        self.request.headers(trace_headers()).send().await
    }
}

pub trait TracedClientExt {
    fn traced_get(&self, url: &str) -> TracedRequest;
    fn traced_post(&self, url: &str) -> TracedRequest;
}

impl TracedClientExt for reqwest::Client {
    fn traced_get(&self, url: &str) -> TracedRequest {
        TracedRequest {
            request: self.get(url),
        }
    }

    fn traced_post(&self, url: &str) -> TracedRequest {
        TracedRequest {
            request: self.post(url),
        }
    }
}
