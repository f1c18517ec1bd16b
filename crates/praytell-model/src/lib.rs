//! Completion adapters for PrayTell

pub mod openai;
pub mod types;

pub use openai::{OpenAIBuilder, OpenAICompletion, OpenAIConfig};

use praytell_core::{Completion, Error, ModelConfig, Result};
use std::sync::Arc;

/// Model factory for creating the completion adapter from configuration
///
/// # Example
/// ```no_run
/// use praytell_core::AppConfig;
/// use praytell_model::CompletionFactory;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = AppConfig::load()?;
/// let completion = CompletionFactory::from_config(&config.model)?;
/// # Ok(())
/// # }
/// ```
pub struct CompletionFactory;

impl CompletionFactory {
    pub fn from_config(config: &ModelConfig) -> Result<Arc<dyn Completion>> {
        match config.provider.to_lowercase().as_str() {
            "openai" => {
                let api_key = config
                    .api_key()
                    .map_err(|e| Error::config_error(e.to_string()))?;

                let openai_config = match config.base_url {
                    Some(ref url) => OpenAIConfig::with_base_url(&config.model_name, url),
                    None => OpenAIConfig::default(&config.model_name),
                }
                .timeout(config.timeout());

                tracing::info!(model = %config.model_name, "Using OpenAI completion adapter");
                Ok(Arc::new(OpenAICompletion::new(api_key, openai_config)?))
            }
            other => Err(Error::config_error(format!(
                "Unknown model provider: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_openai() {
        let config = ModelConfig {
            api_key: Some("sk-test".to_string()),
            ..ModelConfig::default()
        };
        let completion = CompletionFactory::from_config(&config).unwrap();
        assert_eq!(completion.name(), "gpt-4");
    }

    #[test]
    fn test_factory_requires_key() {
        let config = ModelConfig::default();
        assert!(CompletionFactory::from_config(&config).is_err());
    }

    #[test]
    fn test_factory_unknown_provider() {
        let config = ModelConfig {
            provider: "gemini".to_string(),
            api_key: Some("key".to_string()),
            ..ModelConfig::default()
        };
        assert!(CompletionFactory::from_config(&config).is_err());
    }
}
