use crate::models::AuditRecord;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur when writing an audit record
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Invalid sink configuration: {0}")]
    Config(String),

    #[error("Write rejected: {0}")]
    Rejected(String),
}

/// Durable destination for audit records
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Persist one record
    async fn put(&self, record: &AuditRecord) -> Result<(), SinkError>;

    /// Short backend name used in logs
    fn name(&self) -> &'static str;

    /// Check the backend is reachable
    async fn health_check(&self) -> Result<bool, SinkError> {
        Ok(true)
    }
}

/// Best-effort audit writer
///
/// `record` makes exactly one write attempt and never fails: sink errors
/// are logged and dropped, never retried.
#[derive(Clone)]
pub struct AuditLogger {
    sink: Option<Arc<dyn AuditSink>>,
    detached: bool,
}

impl AuditLogger {
    /// Write each record inline, awaiting the single attempt
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            sink: Some(sink),
            detached: false,
        }
    }

    /// Logger that drops every record
    pub fn disabled() -> Self {
        Self {
            sink: None,
            detached: false,
        }
    }

    /// Spawn writes on the runtime instead of awaiting them
    pub fn detached(mut self, detached: bool) -> Self {
        self.detached = detached;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Sink reachability; a disabled logger has nothing to be unhealthy
    pub async fn is_healthy(&self) -> bool {
        let Some(sink) = &self.sink else {
            return true;
        };

        match sink.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                tracing::warn!("Audit sink {} health check failed: {}", sink.name(), e);
                false
            }
        }
    }

    /// Attempt one write of `record`
    pub async fn record(&self, record: AuditRecord) {
        let Some(sink) = self.sink.clone() else {
            tracing::debug!("Audit disabled, dropping record {}", record.id);
            return;
        };

        if self.detached {
            tokio::spawn(async move { write_once(sink.as_ref(), &record).await });
        } else {
            write_once(sink.as_ref(), &record).await;
        }
    }
}

async fn write_once(sink: &dyn AuditSink, record: &AuditRecord) {
    match sink.put(record).await {
        Ok(()) => tracing::debug!("Audit record {} written to {}", record.id, sink.name()),
        Err(e) => tracing::warn!(
            "Audit write to {} failed for record {} (non-blocking): {}",
            sink.name(),
            record.id,
            e
        ),
    }
}

/// Table names are interpolated into SQL and keys, so keep them to a safe alphabet
pub fn validate_table_name(table: &str) -> Result<(), SinkError> {
    let valid = !table.is_empty()
        && table.len() <= 63
        && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(SinkError::Config(format!("invalid table name '{}'", table)))
    }
}
