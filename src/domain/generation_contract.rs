use std::fmt;

use serde::{Deserialize, Serialize};

use super::LlmError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Previously generated program, present only for update requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_code: Option<String>,
}

impl GenerationRequest {
    pub fn create(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            existing_code: None,
        }
    }

    pub fn update(existing_code: impl Into<String>, update_prompt: impl Into<String>) -> Self {
        Self {
            prompt: update_prompt.into(),
            existing_code: Some(existing_code.into()),
        }
    }
}

/// Which path of the generation chain produced a result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderUsed {
    Provider { provider_id: String },
    Fallback,
}

impl ProviderUsed {
    pub fn provider(provider_id: impl Into<String>) -> Self {
        Self::Provider {
            provider_id: provider_id.into(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback)
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Provider { provider_id } => provider_id,
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for ProviderUsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub source_code: String,
    pub provider_used: ProviderUsed,
}

impl GenerationResult {
    pub fn validate(&self) -> Result<(), LlmError> {
        if self.source_code.trim().is_empty() {
            return Err(LlmError::internal(format!(
                "{} produced empty source code",
                self.provider_used
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    SpaceShooter,
    Platformer,
    Puzzle,
    Racing,
    Adventure,
}

impl Archetype {
    /// Classification precedence order.
    pub const ALL: [Archetype; 5] = [
        Archetype::SpaceShooter,
        Archetype::Platformer,
        Archetype::Puzzle,
        Archetype::Racing,
        Archetype::Adventure,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::SpaceShooter => "space_shooter",
            Self::Platformer => "platformer",
            Self::Puzzle => "puzzle",
            Self::Racing => "racing",
            Self::Adventure => "adventure",
        }
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
