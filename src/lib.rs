//! Text Classifier - inference-serving endpoint for short texts
//!
//! Validates a request, acquires a cached pre-trained model, classifies the
//! text and records a best-effort audit entry for every successful call.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{ClassificationHandler, ClassifyError, HandlerResponse, InferenceEngine};
pub use models::{ArtifactKey, AuditRecord, ClassificationResult, InvocationContext};
pub use services::{AuditLogger, AuditSink, ArtifactStore, ModelCache};
