mod errors;
mod generation_contract;

pub use errors::{LlmError, LlmErrorCategory};
pub use generation_contract::{Archetype, GenerationRequest, GenerationResult, ProviderUsed};
