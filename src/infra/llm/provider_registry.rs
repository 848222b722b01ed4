use std::sync::Arc;

use log::{info, warn};

use crate::domain::LlmError;

use super::env::{EnvReader, read_env_var};
use super::{AnthropicProvider, LlmProvider, OpenAiCompatibleProvider};

/// Providers in priority order; index 0 is tried first.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn LlmProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every provider whose credentials are present, primary first.
    ///
    /// A provider without an API key is left out silently. A provider whose
    /// configuration is malformed is left out with a warning.
    pub fn from_env() -> Self {
        Self::from_env_vars(&read_env_var)
    }

    pub(crate) fn from_env_vars(read: EnvReader<'_>) -> Self {
        let mut registry = Self::new();
        registry.register_configured("Anthropic", AnthropicProvider::from_env_vars(read));
        registry.register_configured(
            "OpenAI-compatible",
            OpenAiCompatibleProvider::from_env_vars(read),
        );

        if registry.is_empty() {
            info!("no LLM provider configured; template generation will be used for every request");
        }
        registry
    }

    fn register_configured<P>(&mut self, label: &str, configured: Result<Option<P>, LlmError>)
    where
        P: LlmProvider + 'static,
    {
        match configured {
            Ok(Some(provider)) => {
                let provider_id = provider.provider_id().to_string();
                match self.register(provider) {
                    Ok(()) => info!("{label} provider registered as '{provider_id}'"),
                    Err(error) => warn!("{label} provider could not be registered: {error}"),
                }
            }
            Ok(None) => {}
            Err(error) => warn!("{label} provider is unavailable: {error}"),
        }
    }

    pub fn register<P>(&mut self, provider: P) -> Result<(), LlmError>
    where
        P: LlmProvider + 'static,
    {
        self.register_shared(Arc::new(provider))
    }

    pub fn register_shared(&mut self, provider: Arc<dyn LlmProvider>) -> Result<(), LlmError> {
        let provider_id = provider.provider_id().trim();
        if provider_id.is_empty() {
            return Err(LlmError::validation("provider_id must not be empty"));
        }
        if self
            .providers
            .iter()
            .any(|registered| registered.provider_id().trim() == provider_id)
        {
            return Err(LlmError::validation(format!(
                "provider '{provider_id}' is already registered"
            )));
        }

        self.providers.push(provider);
        Ok(())
    }

    pub fn providers(&self) -> impl Iterator<Item = &Arc<dyn LlmProvider>> {
        self.providers.iter()
    }

    pub fn provider_ids(&self) -> Vec<String> {
        self.providers
            .iter()
            .map(|provider| provider.provider_id().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
