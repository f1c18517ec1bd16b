//! # PrayTell Chat
//!
//! The conversation core: context retrieval, message persistence, grounded
//! prompt composition and the per-conversation state machine.
//!
//! ## Example
//!
//! ```no_run
//! use praytell_chat::{
//!     ChatOrchestrator, ContextRetrievalService, ConversationManager, MessagePersistenceService,
//! };
//! use praytell_core::{AppConfig, CategoryConfig};
//! use praytell_model::CompletionFactory;
//! use praytell_store::StoreFactory;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = AppConfig::load()?;
//! let store = StoreFactory::from_config(&config.store)?;
//!
//! let orchestrator = ChatOrchestrator::builder()
//!     .retrieval(ContextRetrievalService::new(store.clone(), CategoryConfig::chat_turns()))
//!     .completion(CompletionFactory::from_config(&config.model)?)
//!     .build()?;
//! let persistence = MessagePersistenceService::new(store, CategoryConfig::chat_turns());
//!
//! let conversation = ConversationManager::new(
//!     Arc::new(orchestrator),
//!     Arc::new(persistence),
//!     &config.chat.location,
//! );
//! conversation.submit("What time is the service?").await?;
//! # Ok(())
//! # }
//! ```

pub mod conversation;
pub mod orchestrator;
pub mod persistence;
pub mod prompt;
pub mod remote;
pub mod retrieval;
pub mod testing;

pub use conversation::{
    ChatBackend, ConversationManager, CycleOutcome, ERROR_NOTICE, PersistenceStats, Phase,
    TurnPersister, summarize_context,
};
pub use orchestrator::{ChatOrchestrator, ChatOrchestratorBuilder, ChatReply, ChatRequest};
pub use persistence::{MessagePersistenceService, SaveRequest, SavedMessage};
pub use remote::HttpChatClient;
pub use retrieval::{ContextRetrievalService, DEFAULT_CONTEXT_LIMIT};
