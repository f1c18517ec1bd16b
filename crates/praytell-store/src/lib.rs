//! # PrayTell Context Store
//!
//! Adapters for the vector store that holds persisted turns.
//!
//! - [`WeaviateStore`]: semantic search through Weaviate's `nearText`
//! - [`InMemoryContextStore`]: keyword-ranked, for tests and local runs
//!
//! ## Usage
//!
//! ```rust,no_run
//! use praytell_core::AppConfig;
//! use praytell_store::StoreFactory;
//!
//! # fn example() -> praytell_core::Result<()> {
//! let config = AppConfig::test_defaults();
//! let store = StoreFactory::from_config(&config.store)?;
//! assert_eq!(store.name(), "in-memory");
//! # Ok(())
//! # }
//! ```

mod memory;
mod weaviate;

pub use memory::InMemoryContextStore;
pub use weaviate::{WeaviateConfig, WeaviateStore};

use praytell_core::{ContextStore, Error, Result, StoreConfig};
use std::sync::Arc;

/// Creates the configured store adapter, once, at startup
pub struct StoreFactory;

impl StoreFactory {
    pub fn from_config(config: &StoreConfig) -> Result<Arc<dyn ContextStore>> {
        match config.provider.to_lowercase().as_str() {
            "weaviate" => {
                let url = config.url.as_deref().ok_or_else(|| {
                    Error::config_error(
                        "Store URL not configured. Set [store] url in config.toml or WEAVIATE_HOST",
                    )
                })?;

                let mut weaviate = WeaviateConfig::from_endpoint(url, config.timeout())?;
                if let Some(ref key) = config.api_key {
                    weaviate = weaviate.with_api_key(key.clone());
                }

                tracing::info!(endpoint = %weaviate.endpoint, "Using Weaviate context store");
                Ok(Arc::new(WeaviateStore::new(weaviate)?))
            }
            "in-memory" | "memory" => {
                tracing::info!("Using in-memory context store");
                Ok(Arc::new(InMemoryContextStore::new()))
            }
            other => Err(Error::config_error(format!(
                "Unknown store provider: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_in_memory() {
        let config = StoreConfig {
            provider: "in-memory".to_string(),
            ..StoreConfig::default()
        };
        let store = StoreFactory::from_config(&config).unwrap();
        assert_eq!(store.name(), "in-memory");
    }

    #[test]
    fn test_factory_weaviate_requires_url() {
        let config = StoreConfig::default();
        let err = StoreFactory::from_config(&config).err().unwrap();
        assert!(err.to_string().contains("WEAVIATE_HOST"));
    }

    #[test]
    fn test_factory_weaviate() {
        let config = StoreConfig {
            url: Some("http://localhost:8080".to_string()),
            ..StoreConfig::default()
        };
        let store = StoreFactory::from_config(&config).unwrap();
        assert_eq!(store.name(), "weaviate");
    }

    #[test]
    fn test_factory_unknown_provider() {
        let config = StoreConfig {
            provider: "pinecone".to_string(),
            ..StoreConfig::default()
        };
        assert!(StoreFactory::from_config(&config).is_err());
    }
}
