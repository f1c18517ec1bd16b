//! One grounded chat turn: retrieve, compose, complete

use crate::prompt::build_prompt;
use crate::retrieval::{ContextRetrievalService, DEFAULT_CONTEXT_LIMIT};
use chrono::{DateTime, Utc};
use praytell_core::{Completion, CompletionRequest, ContextRecord, Error, Result, format_instant};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default cap on generated tokens
pub const DEFAULT_MAX_TOKENS: u32 = 150;

/// A user message together with the user's situation.
///
/// `datetime` is placed in the prompt as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub location: String,
    pub datetime: String,
}

impl ChatRequest {
    pub fn new(
        message: impl Into<String>,
        location: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self::with_datetime(message, location, format_instant(&at))
    }

    /// Build a request around datetime text that is not a parsed instant
    pub fn with_datetime(
        message: impl Into<String>,
        location: impl Into<String>,
        datetime: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            location: location.into(),
            datetime: datetime.into(),
        }
    }
}

/// The generated reply and the context it was grounded on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    pub context: Vec<ContextRecord>,
}

/// Coordinates retrieval and completion for a single message.
///
/// Holds no per-conversation state and persists nothing, so one instance can
/// serve any number of conversations concurrently.
pub struct ChatOrchestrator {
    retrieval: ContextRetrievalService,
    completion: Arc<dyn Completion>,
    context_limit: usize,
    max_tokens: Option<u32>,
}

impl ChatOrchestrator {
    pub fn builder() -> ChatOrchestratorBuilder {
        ChatOrchestratorBuilder::new()
    }

    pub fn context_limit(&self) -> usize {
        self.context_limit
    }

    /// Answer one message.
    ///
    /// A failed context search degrades to an empty context. Completion
    /// failures, including an empty reply, surface as [`Error::Completion`].
    pub async fn respond(&self, request: &ChatRequest) -> Result<ChatReply> {
        let context = match self
            .retrieval
            .retrieve(&request.message, self.context_limit)
            .await
        {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "Context retrieval failed, answering without context");
                Vec::new()
            }
        };

        let messages = build_prompt(
            &context,
            &request.location,
            &request.datetime,
            &request.message,
        );

        let text = self
            .completion
            .complete(CompletionRequest {
                messages,
                max_tokens: self.max_tokens,
            })
            .await
            .map_err(|e| match e {
                Error::Completion { .. } => e,
                other => Error::completion(other.to_string()),
            })?;

        let reply = text.trim();
        if reply.is_empty() {
            return Err(Error::completion("Completion returned no text"));
        }

        tracing::debug!(
            model = self.completion.name(),
            context = context.len(),
            "Generated reply"
        );

        Ok(ChatReply {
            reply: reply.to_string(),
            context,
        })
    }
}

pub struct ChatOrchestratorBuilder {
    retrieval: Option<ContextRetrievalService>,
    completion: Option<Arc<dyn Completion>>,
    context_limit: usize,
    max_tokens: Option<u32>,
}

impl ChatOrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            retrieval: None,
            completion: None,
            context_limit: DEFAULT_CONTEXT_LIMIT,
            max_tokens: Some(DEFAULT_MAX_TOKENS),
        }
    }

    pub fn retrieval(mut self, retrieval: ContextRetrievalService) -> Self {
        self.retrieval = Some(retrieval);
        self
    }

    pub fn completion(mut self, completion: Arc<dyn Completion>) -> Self {
        self.completion = Some(completion);
        self
    }

    pub fn context_limit(mut self, limit: usize) -> Self {
        self.context_limit = limit;
        self
    }

    /// Cap on generated tokens; `0` leaves the engine's default in place
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = (max_tokens > 0).then_some(max_tokens);
        self
    }

    pub fn build(self) -> Result<ChatOrchestrator> {
        let retrieval = self
            .retrieval
            .ok_or_else(|| Error::config_error("Retrieval service is required"))?;
        let completion = self
            .completion
            .ok_or_else(|| Error::config_error("Completion engine is required"))?;
        if self.context_limit == 0 {
            return Err(Error::config_error("Context limit must be at least 1"));
        }

        Ok(ChatOrchestrator {
            retrieval,
            completion,
            context_limit: self.context_limit,
            max_tokens: self.max_tokens,
        })
    }
}

impl Default for ChatOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::SYSTEM_INSTRUCTION;
    use crate::testing::{FailingCompletion, StaticCompletion, StubStore, chat_hit};
    use praytell_core::{CategoryConfig, Role};

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn orchestrator(store: Arc<StubStore>, completion: Arc<dyn Completion>) -> ChatOrchestrator {
        ChatOrchestrator::builder()
            .retrieval(ContextRetrievalService::new(store, CategoryConfig::chat_turns()))
            .completion(completion)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_respond_with_context() {
        let store = Arc::new(StubStore::with_hits(vec![
            chat_hit("Service is at 9am", "New York, USA", "2024-01-01T00:00:00Z"),
            chat_hit("Doors open at 8:30", "New York, USA", "2024-01-02T00:00:00Z"),
        ]));
        let completion = Arc::new(StaticCompletion::new("  The service starts at 9am.\n"));
        let orchestrator = orchestrator(store, completion.clone());

        let reply = orchestrator
            .respond(&ChatRequest::new(
                "What time is the service?",
                "New York, USA",
                at("2024-01-03T10:00:00Z"),
            ))
            .await
            .unwrap();

        assert_eq!(reply.reply, "The service starts at 9am.");
        assert_eq!(reply.context.len(), 2);
        assert_eq!(reply.context[0].body, "Service is at 9am");

        let requests = completion.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].max_tokens, Some(DEFAULT_MAX_TOKENS));
        assert_eq!(requests[0].messages[0].content, SYSTEM_INSTRUCTION);
        assert_eq!(requests[0].messages[1].role, Role::User);
        let user = &requests[0].messages[1].content;
        assert!(user.contains("Message: Doors open at 8:30"));
        assert!(user.contains("Current User Location: New York, USA"));
        assert!(user.contains("Current Datetime: 2024-01-03T10:00:00Z"));
        assert!(user.ends_with("User's message: What time is the service?"));
    }

    #[tokio::test]
    async fn test_datetime_text_reaches_prompt_verbatim() {
        let completion = Arc::new(StaticCompletion::new("ok"));
        let orchestrator = orchestrator(Arc::new(StubStore::new()), completion.clone());

        orchestrator
            .respond(&ChatRequest::with_datetime("Hi", "NYC", "Sunday morning"))
            .await
            .unwrap();

        let user = &completion.requests()[0].messages[1].content;
        assert!(user.contains("Current Datetime: Sunday morning\n"));
    }

    #[test]
    fn test_request_from_instant_is_rfc3339() {
        let request = ChatRequest::new("Hi", "NYC", at("2024-01-01T05:00:00+05:00"));
        assert_eq!(request.datetime, "2024-01-01T00:00:00Z");
    }

    #[tokio::test]
    async fn test_retrieval_failure_degrades() {
        let store = Arc::new(StubStore::failing());
        let completion = Arc::new(StaticCompletion::new("Hello!"));
        let orchestrator = orchestrator(store, completion);

        let reply = orchestrator
            .respond(&ChatRequest::new("Hi", "NYC", at("2024-01-01T00:00:00Z")))
            .await
            .unwrap();

        assert_eq!(reply.reply, "Hello!");
        assert!(reply.context.is_empty());
    }

    #[tokio::test]
    async fn test_completion_failure_keeps_status() {
        let store = Arc::new(StubStore::new());
        let orchestrator = orchestrator(store, Arc::new(FailingCompletion::new(429)));

        let err = orchestrator
            .respond(&ChatRequest::new("Hi", "NYC", at("2024-01-01T00:00:00Z")))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Completion { status: Some(429), .. }));
    }

    #[tokio::test]
    async fn test_blank_completion_is_error() {
        let store = Arc::new(StubStore::new());
        let orchestrator = orchestrator(store, Arc::new(StaticCompletion::new("   ")));

        let err = orchestrator
            .respond(&ChatRequest::new("Hi", "NYC", at("2024-01-01T00:00:00Z")))
            .await
            .unwrap_err();

        assert!(err.is_completion());
    }

    #[tokio::test]
    async fn test_custom_limits() {
        let hits = (0..5)
            .map(|i| chat_hit(&format!("note {i}"), "NYC", "2024-01-01T00:00:00Z"))
            .collect();
        let store = Arc::new(StubStore::with_hits(hits));
        let completion = Arc::new(StaticCompletion::new("ok"));
        let orchestrator = ChatOrchestrator::builder()
            .retrieval(ContextRetrievalService::new(store, CategoryConfig::chat_turns()))
            .completion(completion.clone())
            .context_limit(1)
            .max_tokens(0)
            .build()
            .unwrap();

        let reply = orchestrator
            .respond(&ChatRequest::new("note", "NYC", at("2024-01-01T00:00:00Z")))
            .await
            .unwrap();

        assert_eq!(reply.context.len(), 1);
        assert_eq!(completion.requests()[0].max_tokens, None);
    }

    #[test]
    fn test_builder_requires_completion() {
        let result = ChatOrchestrator::builder()
            .retrieval(ContextRetrievalService::new(
                Arc::new(StubStore::new()),
                CategoryConfig::chat_turns(),
            ))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_reply_wire_format() {
        let reply = ChatReply {
            reply: "Hi".to_string(),
            context: vec![ContextRecord::new("a", "NYC", "2024-01-01T00:00:00Z")],
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "reply": "Hi",
                "context": [{"body": "a", "location": "NYC", "datetime": "2024-01-01T00:00:00Z"}]
            })
        );
    }
}
