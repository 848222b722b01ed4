mod anthropic;
mod env;
mod openai_compatible;
mod prompt_builder;
mod provider;
mod provider_registry;
mod response_parsing;

pub use anthropic::AnthropicProvider;
pub use openai_compatible::OpenAiCompatibleProvider;
pub use prompt_builder::{BuiltPrompt, PromptBuilder};
pub use provider::LlmProvider;
pub use provider_registry::ProviderRegistry;
