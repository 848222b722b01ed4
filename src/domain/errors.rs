use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorCategory {
    UserActionRequired,
    TemporaryFailure,
    InternalFailure,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LlmError {
    #[error("validation failed: {message}")]
    Validation { message: String },
    #[error("provider authentication failed")]
    Auth,
    #[error("provider rate limit reached")]
    RateLimited,
    #[error("provider request timed out")]
    Timeout,
    #[error("provider returned an invalid response: {message}")]
    InvalidResponse { message: String },
    #[error("provider transport failed: {message}")]
    Transport { message: String },
    #[error("internal error: {message}")]
    Internal { message: String },
    #[error("template generation failed: {message}")]
    Template { message: String },
}

impl LlmError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn template(message: impl Into<String>) -> Self {
        Self::Template {
            message: message.into(),
        }
    }

    pub fn category(&self) -> LlmErrorCategory {
        match self {
            Self::Validation { .. } | Self::Auth => LlmErrorCategory::UserActionRequired,
            Self::RateLimited | Self::Timeout | Self::Transport { .. } => {
                LlmErrorCategory::TemporaryFailure
            }
            Self::InvalidResponse { .. } | Self::Internal { .. } | Self::Template { .. } => {
                LlmErrorCategory::InternalFailure
            }
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message } => {
                format!("Please review the provider configuration: {message}")
            }
            Self::Auth => {
                "Authentication failed. Check your provider API key and configuration.".to_string()
            }
            Self::RateLimited => {
                "The provider is rate limiting requests. Please retry in a moment.".to_string()
            }
            Self::Timeout => "The provider did not respond in time. Please retry.".to_string(),
            Self::InvalidResponse { message } => {
                format!("The provider returned an invalid response: {message}")
            }
            Self::Transport { message } => {
                format!("Could not reach the provider service: {message}")
            }
            Self::Internal { .. } | Self::Template { .. } => {
                "Game generation failed. Please try again.".to_string()
            }
        }
    }
}
