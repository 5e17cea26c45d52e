use serde::{Deserialize, Serialize};

/// Minimum number of characters in the trimmed input text
pub const MIN_TEXT_LENGTH: usize = 10;

/// A validated classification request
///
/// Only built by `core::validation::parse_request`, which guarantees the
/// trimmed text is at least `MIN_TEXT_LENGTH` characters long.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRequest {
    pub text: String,
}

impl ClassificationRequest {
    /// Character count of the original, untrimmed text
    pub fn input_length(&self) -> usize {
        self.text.chars().count()
    }
}

/// Metadata supplied by the hosting environment for one invocation
#[derive(Debug, Clone, Default)]
pub struct InvocationContext {
    pub request_id: Option<String>,
}

impl InvocationContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: Some(request_id.into()),
        }
    }

    /// Correlation id for the audit record, `"unknown"` when the host gave none
    pub fn request_id_or_unknown(&self) -> &str {
        self.request_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or("unknown")
    }
}
