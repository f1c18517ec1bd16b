//! # PrayTell Telemetry
//!
//! Structured logging and OpenTelemetry tracing for the chat service.
//!
//! This crate sets up the process-wide `tracing` subscriber and provides span
//! helpers for the two external calls of a chat turn: the context-store
//! search and the completion request. Span attributes follow the
//! OpenTelemetry semantic conventions for generative AI where one exists.

mod spans;
mod tracer;

pub use spans::{
    CompletionSpanAttributes, RetrievalSpanAttributes, safe_serialize, trace_completion_call,
    trace_retrieval,
};
pub use tracer::init_telemetry;

/// OpenTelemetry span attribute constants.
pub mod attributes {
    // Generic AI attributes
    pub const GEN_AI_OPERATION_NAME: &str = "gen_ai.operation.name";
    pub const GEN_AI_SYSTEM: &str = "gen_ai.system";
    pub const GEN_AI_REQUEST_MODEL: &str = "gen_ai.request.model";
    pub const GEN_AI_REQUEST_MAX_TOKENS: &str = "gen_ai.request.max_tokens";
    pub const GEN_AI_USAGE_OUTPUT_TOKENS: &str = "gen_ai.usage.output_tokens";

    // Service-specific attributes
    pub const PRAYTELL_LLM_REQUEST: &str = "praytell.llm_request";
    pub const PRAYTELL_LLM_RESPONSE: &str = "praytell.llm_response";
    pub const PRAYTELL_STORE: &str = "praytell.store";
    pub const PRAYTELL_CATEGORY: &str = "praytell.category";
    pub const PRAYTELL_QUERY: &str = "praytell.query";
    pub const PRAYTELL_LIMIT: &str = "praytell.limit";
    pub const PRAYTELL_HITS: &str = "praytell.hits";

    // System name constant
    pub const SYSTEM_NAME: &str = "praytell";
}
