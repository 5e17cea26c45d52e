// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{ArtifactKey, AuditRecord, ClassificationResult, AUDIT_TEXT_LIMIT};
pub use requests::{ClassificationRequest, InvocationContext, MIN_TEXT_LENGTH};
pub use responses::{ErrorResponse, HealthResponse};
