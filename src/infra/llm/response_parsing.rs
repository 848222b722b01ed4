use crate::domain::LlmError;

const MAX_ERROR_MESSAGE_LEN: usize = 256;

pub(crate) fn truncate_message(body: &str) -> String {
    let compact = body.trim().replace('\n', " ");
    compact.chars().take(MAX_ERROR_MESSAGE_LEN).collect()
}

/// Accepts the completion text verbatim unless it carries no code at all.
pub(crate) fn require_source_text(provider_label: &str, text: String) -> Result<String, LlmError> {
    if text.trim().is_empty() {
        return Err(LlmError::invalid_response(format!(
            "{provider_label} response did not include any generated code"
        )));
    }
    Ok(text)
}
