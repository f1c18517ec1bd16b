use crate::{NearTextQuery, NewRecord, RecordFields, Result, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A similarity-search capable vector store.
///
/// Implementations own their transport (endpoint, credentials, timeouts);
/// callers only see categories, properties and ranked hits.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Insert one record and return the id the store assigned to it
    async fn insert(&self, record: NewRecord) -> Result<String>;

    /// Nearest-neighbour text search, most relevant hit first
    async fn nearest_text(&self, query: NearTextQuery) -> Result<Vec<RecordFields>>;
}

/// One role-tagged prompt message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionRequest {
    pub messages: Vec<PromptMessage>,
    /// Upper bound on generated tokens
    pub max_tokens: Option<u32>,
}

/// A text-generation engine
#[async_trait]
pub trait Completion: Send + Sync {
    /// Model name
    fn name(&self) -> &str;

    /// Generate a reply for the given prompt.
    ///
    /// Transport failures, non-success statuses and malformed responses are
    /// `Error::Completion`; a refusal from the model is ordinary reply text.
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}
