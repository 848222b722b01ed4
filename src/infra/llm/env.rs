use std::time::Duration;

use crate::domain::LlmError;

/// Per-call timeout applied when neither a provider-specific nor a global
/// timeout is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub(crate) const ENV_GLOBAL_TIMEOUT_SECS: &str = "VIBR_LLM_TIMEOUT_SECS";

/// Source of configuration values, keyed by environment variable name.
pub(crate) type EnvReader<'a> = &'a dyn Fn(&str) -> Result<Option<String>, LlmError>;

pub(crate) fn read_env_var(name: &str) -> Result<Option<String>, LlmError> {
    match std::env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(error) => Err(LlmError::validation(format!(
            "{name} could not be read: {error}"
        ))),
    }
}

/// Reads an API key, preferring `primary` over `fallback`. Blank values count as unset.
pub(crate) fn read_api_key(
    read: EnvReader<'_>,
    primary: &str,
    fallback: &str,
) -> Result<Option<String>, LlmError> {
    for name in [primary, fallback] {
        if let Some(value) = read(name)?
            && !value.trim().is_empty()
        {
            return Ok(Some(value.trim().to_string()));
        }
    }
    Ok(None)
}

pub(crate) fn read_non_empty(read: EnvReader<'_>, name: &str) -> Result<Option<String>, LlmError> {
    let Some(value) = read(name)? else {
        return Ok(None);
    };
    let value = value.trim();
    if value.is_empty() {
        return Err(LlmError::validation(format!("{name} must not be empty")));
    }
    Ok(Some(value.to_string()))
}

pub(crate) fn parse_timeout_seconds(name: &str, value: &str) -> Result<Duration, LlmError> {
    let parsed = value.trim().parse::<u64>().map_err(|_| {
        LlmError::validation(format!("{name} must be a positive integer in seconds"))
    })?;
    if parsed == 0 {
        return Err(LlmError::validation(format!(
            "{name} must be greater than 0 seconds"
        )));
    }
    Ok(Duration::from_secs(parsed))
}

pub(crate) fn read_timeout(read: EnvReader<'_>, name: &str) -> Result<Option<Duration>, LlmError> {
    let Some(value) = read(name)? else {
        return Ok(None);
    };
    Ok(Some(parse_timeout_seconds(name, &value)?))
}

pub(crate) fn resolve_timeout_with_global_fallback<F>(
    provider_timeout: Option<Duration>,
    read_global_timeout: F,
    default_timeout: Duration,
) -> Result<Duration, LlmError>
where
    F: FnOnce() -> Result<Option<Duration>, LlmError>,
{
    if let Some(timeout) = provider_timeout {
        return Ok(timeout);
    }

    Ok(read_global_timeout()?.unwrap_or(default_timeout))
}

#[cfg(test)]
pub(crate) fn reader_from_pairs(
    pairs: &[(&str, &str)],
) -> impl Fn(&str) -> Result<Option<String>, LlmError> + use<> {
    let values: std::collections::HashMap<String, String> = pairs
        .iter()
        .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
        .collect();
    move |name: &str| Ok(values.get(name).cloned())
}
