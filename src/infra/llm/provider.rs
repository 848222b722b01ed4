use crate::domain::{GenerationRequest, LlmError};

/// A remote code-generation backend.
///
/// Implementations issue exactly one call per `generate` invocation and return
/// the response text verbatim. Retrying and failover are the caller's job.
pub trait LlmProvider: Send + Sync {
    fn provider_id(&self) -> &str;

    fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError>;
}
