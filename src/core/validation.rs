use crate::models::{ClassificationRequest, MIN_TEXT_LENGTH};
use serde_json::Value;
use thiserror::Error;

/// Client-caused request violations, in the order they are checked
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Request body must be valid JSON")]
    MalformedPayload,

    #[error("Field 'text' (non-empty string) is required")]
    MissingField,

    #[error("Text must be at least {min} characters")]
    TextTooShort { min: usize },
}

/// Parse and validate a raw request payload
///
/// An empty body is treated as `{}`; anything else must parse as a JSON object. Structure is checked before the
/// `text` field, and the field before its length; the first violation wins.
pub fn parse_request(payload: &[u8]) -> Result<ClassificationRequest, ValidationError> {
    let body: Value = if payload.is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_slice(payload).map_err(|_| ValidationError::MalformedPayload)?
    };

    let fields = body.as_object().ok_or(ValidationError::MalformedPayload)?;

    let text = match fields.get("text") {
        Some(Value::String(text)) if !text.trim().is_empty() => text,
        _ => return Err(ValidationError::MissingField),
    };

    if text.trim().chars().count() < MIN_TEXT_LENGTH {
        return Err(ValidationError::TextTooShort { min: MIN_TEXT_LENGTH });
    }

    Ok(ClassificationRequest { text: text.clone() })
}
