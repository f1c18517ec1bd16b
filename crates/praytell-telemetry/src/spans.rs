//! Span creation helpers for completion calls and context retrieval

use crate::attributes::*;

/// Attributes for tracing a completion call
#[derive(Debug, Clone)]
pub struct CompletionSpanAttributes {
    pub model: String,
    pub request_json: String,
    pub response_text: String,
    pub max_tokens: Option<i64>,
    pub completion_tokens: Option<i64>,
}

/// Attributes for tracing a context-store search
#[derive(Debug, Clone)]
pub struct RetrievalSpanAttributes {
    pub store: String,
    pub category: String,
    pub query: String,
    pub limit: i64,
    pub hits: i64,
}

/// Record a span for one completion request.
///
/// Carries the model name, the serialized prompt and the reply, plus the
/// token cap and usage when known.
pub fn trace_completion_call(attrs: CompletionSpanAttributes) {
    let span = tracing::info_span!(
        "call_llm",
        { GEN_AI_OPERATION_NAME } = "chat",
        { GEN_AI_SYSTEM } = SYSTEM_NAME,
        { GEN_AI_REQUEST_MODEL } = %attrs.model,
        { PRAYTELL_LLM_REQUEST } = %attrs.request_json,
        { PRAYTELL_LLM_RESPONSE } = %attrs.response_text,
        { GEN_AI_REQUEST_MAX_TOKENS } = tracing::field::Empty,
        { GEN_AI_USAGE_OUTPUT_TOKENS } = tracing::field::Empty,
    );

    if let Some(max_tokens) = attrs.max_tokens {
        span.record(GEN_AI_REQUEST_MAX_TOKENS, max_tokens);
    }
    if let Some(tokens) = attrs.completion_tokens {
        span.record(GEN_AI_USAGE_OUTPUT_TOKENS, tokens);
    }

    // Enter and immediately exit the span (it's recorded)
    let _guard = span.enter();
}

/// Record a span for one nearest-neighbour search.
pub fn trace_retrieval(attrs: RetrievalSpanAttributes) {
    let span = tracing::info_span!(
        "retrieve_context",
        { GEN_AI_OPERATION_NAME } = "retrieve",
        { PRAYTELL_STORE } = %attrs.store,
        { PRAYTELL_CATEGORY } = %attrs.category,
        { PRAYTELL_QUERY } = %attrs.query,
        { PRAYTELL_LIMIT } = attrs.limit,
        { PRAYTELL_HITS } = attrs.hits,
    );

    let _guard = span.enter();
}

/// Helper to safely serialize to JSON string
pub fn safe_serialize<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "<not serializable>".to_string())
}
