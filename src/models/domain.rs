use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maximum number of characters of input text kept in an audit record
pub const AUDIT_TEXT_LIMIT: usize = 1000;

/// Identity of one immutable model artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    pub store: String,
    pub key: String,
}

impl ArtifactKey {
    pub fn new(store: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            store: store.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.store, self.key)
    }
}

/// Classification returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub id: Uuid,
    pub category: String,
    pub confidence: f64,
    pub input_length: usize,
}

impl ClassificationResult {
    /// Build a result with a freshly generated id
    pub fn new(category: String, confidence: f64, input_length: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            category,
            confidence,
            input_length,
        }
    }
}

/// One row written to the audit sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    /// Seconds since the Unix epoch
    pub timestamp: f64,
    pub text: String,
    pub category: String,
    pub confidence: f64,
    pub request_id: String,
}

impl AuditRecord {
    /// Build the audit record for a result, stamped with the current time
    pub fn from_result(result: &ClassificationResult, text: &str, request_id: &str) -> Self {
        let now = chrono::Utc::now();
        Self::at(result, text, request_id, now)
    }

    pub fn at(
        result: &ClassificationResult,
        text: &str,
        request_id: &str,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        Self {
            id: result.id,
            timestamp: now.timestamp_micros() as f64 / 1_000_000.0,
            text: truncate_chars(text, AUDIT_TEXT_LIMIT).to_string(),
            category: result.category.clone(),
            confidence: result.confidence,
            request_id: request_id.to_string(),
        }
    }
}

/// Longest prefix of `text` holding at most `max` characters
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
