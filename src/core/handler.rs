use crate::core::inference::{InferenceEngine, InferenceError};
use crate::core::validation::{parse_request, ValidationError};
use crate::models::{ArtifactKey, AuditRecord, ClassificationResult, ErrorResponse, InvocationContext};
use crate::services::{AuditLogger, ModelCache, ModelError};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// Every way a classification request can fail
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("Failed to load model: {0}")]
    ArtifactUnavailable(String),

    #[error("Model artifact is corrupt: {0}")]
    ArtifactCorrupt(String),

    #[error("Inference failed: {0}")]
    InferenceFailed(String),
}

impl ClassifyError {
    /// HTTP-equivalent status for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ClassifyError::Invalid(_) => 400,
            ClassifyError::ArtifactUnavailable(_)
            | ClassifyError::ArtifactCorrupt(_)
            | ClassifyError::InferenceFailed(_) => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }

    /// Body returned to the caller, optionally without the underlying cause
    pub fn to_response(&self, expose_detail: bool) -> ErrorResponse {
        if expose_detail || self.is_client_error() {
            return ErrorResponse::new(self.to_string());
        }

        let message = match self {
            ClassifyError::ArtifactUnavailable(_) => "Failed to load model",
            ClassifyError::ArtifactCorrupt(_) => "Model artifact is corrupt",
            _ => "Inference failed",
        };
        ErrorResponse::new(message)
    }
}

impl From<Arc<ModelError>> for ClassifyError {
    fn from(err: Arc<ModelError>) -> Self {
        match err.as_ref() {
            ModelError::Unavailable(e) => ClassifyError::ArtifactUnavailable(e.to_string()),
            ModelError::Corrupt(e) => ClassifyError::ArtifactCorrupt(e.to_string()),
        }
    }
}

impl From<InferenceError> for ClassifyError {
    fn from(err: InferenceError) -> Self {
        ClassifyError::InferenceFailed(err.to_string())
    }
}

/// Body of a handler response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Classified(ClassificationResult),
    Failed(ErrorResponse),
}

/// Status code plus structured body, independent of the transport
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl HandlerResponse {
    pub fn ok(result: ClassificationResult) -> Self {
        Self {
            status: 200,
            body: ResponseBody::Classified(result),
        }
    }

    pub fn error(status: u16, body: ErrorResponse) -> Self {
        Self {
            status,
            body: ResponseBody::Failed(body),
        }
    }

    /// Serialized body
    pub fn body_json(&self) -> String {
        // Only string, number and uuid fields: serialization cannot fail
        serde_json::to_string(&self.body).unwrap_or_else(|_| r#"{"error":"serialization failed"}"#.to_string())
    }
}

/// Orchestrates one classification request
///
/// Validating → LoadingModel → Inferring → Logging → Responding, exiting
/// early with an error response from the first three states.
pub struct ClassificationHandler {
    cache: Arc<ModelCache>,
    engine: InferenceEngine,
    audit: AuditLogger,
    model: ArtifactKey,
    expose_internal_errors: bool,
}

impl ClassificationHandler {
    pub fn new(cache: Arc<ModelCache>, audit: AuditLogger, model: ArtifactKey) -> Self {
        Self {
            cache,
            engine: InferenceEngine::new(),
            audit,
            model,
            expose_internal_errors: true,
        }
    }

    /// Whether 500 bodies carry the underlying cause
    pub fn expose_internal_errors(mut self, expose: bool) -> Self {
        self.expose_internal_errors = expose;
        self
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    /// Handle a raw payload and shape the response
    pub async fn handle(&self, payload: &[u8], ctx: &InvocationContext) -> HandlerResponse {
        let request_id = ctx.request_id_or_unknown();

        match self.classify(payload, ctx).await {
            Ok(result) => {
                tracing::info!(
                    request_id,
                    category = %result.category,
                    confidence = result.confidence,
                    "Classified text ({} chars)",
                    result.input_length
                );
                HandlerResponse::ok(result)
            }
            Err(e) => {
                if e.is_client_error() {
                    tracing::info!(request_id, "Rejected request: {}", e);
                } else {
                    tracing::error!(request_id, "Classification failed: {}", e);
                }
                HandlerResponse::error(e.status_code(), e.to_response(self.expose_internal_errors))
            }
        }
    }

    /// Run the request lifecycle, returning the result or the first failure
    pub async fn classify(
        &self,
        payload: &[u8],
        ctx: &InvocationContext,
    ) -> Result<ClassificationResult, ClassifyError> {
        let request = parse_request(payload)?;

        let model = self.cache.acquire(&self.model.store, &self.model.key).await?;

        let prediction = self.engine.classify(model.as_ref(), &request.text)?;

        let result = ClassificationResult::new(
            prediction.category,
            prediction.confidence,
            request.input_length(),
        );

        // Never alters the result
        let record = AuditRecord::from_result(&result, &request.text, ctx.request_id_or_unknown());
        self.audit.record(record).await;

        Ok(result)
    }
}
