// Service exports
pub mod audit;
pub mod model_cache;
pub mod postgres;
pub mod redis_sink;
pub mod store;

pub use audit::{AuditLogger, AuditSink, SinkError};
pub use model_cache::{ModelCache, ModelError};
pub use postgres::PostgresAuditSink;
pub use redis_sink::RedisAuditSink;
pub use store::{ArtifactStore, FsArtifactStore, HttpArtifactStore, StoreError};
