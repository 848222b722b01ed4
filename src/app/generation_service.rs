use std::sync::Arc;

use log::{info, warn};

use crate::domain::{GenerationRequest, GenerationResult, LlmError, ProviderUsed};
use crate::infra::llm::ProviderRegistry;
use crate::infra::templates::TemplateGenerator;

/// Walks the registered providers in priority order and falls back to the
/// offline template generator once all of them have failed.
#[derive(Clone)]
pub struct GenerationService {
    registry: ProviderRegistry,
    generator: Arc<TemplateGenerator>,
}

impl GenerationService {
    pub fn new(registry: ProviderRegistry, generator: TemplateGenerator) -> Self {
        Self {
            registry,
            generator: Arc::new(generator),
        }
    }

    pub fn from_env() -> Result<Self, LlmError> {
        Ok(Self::new(ProviderRegistry::from_env(), TemplateGenerator::new()?))
    }

    pub fn generate(&self, prompt: &str) -> Result<GenerationResult, LlmError> {
        self.run(&GenerationRequest::create(prompt))
    }

    pub fn update(
        &self,
        existing_code: &str,
        update_prompt: &str,
    ) -> Result<GenerationResult, LlmError> {
        self.run(&GenerationRequest::update(existing_code, update_prompt))
    }

    /// Provider failures never reach the caller; only a broken fallback does.
    pub fn run(&self, request: &GenerationRequest) -> Result<GenerationResult, LlmError> {
        let result = match self.try_providers(request) {
            Some(result) => result,
            None => self.fallback(request)?,
        };

        result.validate()?;
        Ok(result)
    }

    fn try_providers(&self, request: &GenerationRequest) -> Option<GenerationResult> {
        for provider in self.registry.providers() {
            let provider_id = provider.provider_id();
            match provider.generate(request) {
                Ok(source_code) if !source_code.trim().is_empty() => {
                    info!("game code produced by provider '{provider_id}'");
                    return Some(GenerationResult {
                        source_code,
                        provider_used: ProviderUsed::provider(provider_id),
                    });
                }
                Ok(_) => warn!("provider '{provider_id}' returned empty code; trying next"),
                Err(error) => warn!(
                    "provider '{provider_id}' failed ({:?}): {error}; trying next",
                    error.category()
                ),
            }
        }
        None
    }

    fn fallback(&self, request: &GenerationRequest) -> Result<GenerationResult, LlmError> {
        let source_code = match request.existing_code.as_deref() {
            Some(existing_code) => {
                info!("no provider could apply the update; returning existing code annotated");
                annotate_failed_update(existing_code, &request.prompt)
            }
            None => {
                info!("no provider produced code; using template generator");
                self.generator.render(&request.prompt)?
            }
        };

        Ok(GenerationResult {
            source_code,
            provider_used: ProviderUsed::Fallback,
        })
    }
}

/// Prefixes the untouched program with a comment explaining that the
/// requested change was not applied.
pub fn annotate_failed_update(existing_code: &str, update_prompt: &str) -> String {
    let requested = update_prompt.split_whitespace().collect::<Vec<_>>().join(" ");
    format!(
        "# NOTE: the requested update could not be applied because no code generator was available.\n\
         # Requested change: {requested}\n\
         # The original code is kept unchanged below.\n\
         \n\
         {existing_code}"
    )
}
