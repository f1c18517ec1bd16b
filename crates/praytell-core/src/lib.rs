//! Core traits and types for PrayTell
//!
//! This crate provides the data model shared by every other crate in the
//! workspace: conversation turns, retrieved context records, the adapter
//! traits for the vector store and the completion engine, the error taxonomy
//! and the service configuration.

pub mod config;
pub mod error;
pub mod record;
pub mod traits;
pub mod turn;

// Re-exports
pub use config::{
    AppConfig, ChatConfig, ModelConfig, ObservabilityConfig, ServerConfig, StoreConfig,
};
pub use error::{Error, Result};
pub use record::{CategoryConfig, ContextRecord, NearTextQuery, NewRecord, RecordFields};
pub use traits::{Completion, CompletionRequest, ContextStore, PromptMessage};
pub use turn::{Role, Turn, format_instant};
