use crate::models::AuditRecord;
use crate::services::audit::{validate_table_name, AuditSink, SinkError};
use async_trait::async_trait;
use redis::aio::ConnectionManager;

/// Redis audit sink
///
/// Stores each record as a hash under `{table}:{id}`, optionally expiring
/// after `ttl_secs`.
pub struct RedisAuditSink {
    // Cloned per write; clones share one multiplexed connection
    redis: ConnectionManager,
    table: String,
    ttl_secs: Option<u64>,
}

impl RedisAuditSink {
    /// Connect to Redis
    pub async fn new(redis_url: &str, table: &str, ttl_secs: Option<u64>) -> Result<Self, SinkError> {
        validate_table_name(table)?;

        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;

        tracing::info!("Redis audit sink ready (prefix: {})", table);

        Ok(Self {
            redis,
            table: table.to_string(),
            ttl_secs,
        })
    }

    fn record_key(&self, record: &AuditRecord) -> String {
        record_key(&self.table, record)
    }
}

fn record_key(table: &str, record: &AuditRecord) -> String {
    format!("{}:{}", table, record.id)
}

/// HSET command for one record, field order matching the record
fn hset_command(key: &str, record: &AuditRecord) -> redis::Cmd {
    let mut cmd = redis::cmd("HSET");
    cmd.arg(key)
        .arg("id")
        .arg(record.id.to_string())
        .arg("timestamp")
        .arg(record.timestamp)
        .arg("text")
        .arg(&record.text)
        .arg("category")
        .arg(&record.category)
        .arg("confidence")
        .arg(record.confidence)
        .arg("request_id")
        .arg(&record.request_id);
    cmd
}

#[async_trait]
impl AuditSink for RedisAuditSink {
    async fn put(&self, record: &AuditRecord) -> Result<(), SinkError> {
        let key = self.record_key(record);

        let mut conn = self.redis.clone();
        let _: () = hset_command(&key, record).query_async(&mut conn).await?;

        if let Some(ttl) = self.ttl_secs {
            let _: () = redis::cmd("EXPIRE")
                .arg(&key)
                .arg(ttl)
                .query_async(&mut conn)
                .await?;
        }

        tracing::trace!("Audit hash set: {}", key);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }

    async fn health_check(&self) -> Result<bool, SinkError> {
        let mut conn = self.redis.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClassificationResult;

    fn sample_record() -> AuditRecord {
        let result = ClassificationResult::new("rec.sport.baseball".to_string(), 0.6, 25);
        AuditRecord::from_result(&result, "The pitcher threw a no-hitter", "req-redis")
    }

    #[test]
    fn test_record_key() {
        let record = sample_record();
        assert_eq!(
            record_key("ClassificationLogsTable", &record),
            format!("ClassificationLogsTable:{}", record.id)
        );
    }

    #[test]
    fn test_hset_carries_every_field() {
        let record = sample_record();
        let packed = String::from_utf8_lossy(&hset_command("k", &record).get_packed_command()).into_owned();

        for field in ["id", "timestamp", "text", "category", "confidence", "request_id"] {
            assert!(packed.contains(field), "missing field {}", field);
        }
        assert!(packed.contains("The pitcher threw a no-hitter"));
        assert!(packed.contains("req-redis"));
    }

    #[tokio::test]
    #[ignore = "Requires Redis"]
    async fn test_put_record() {
        let sink = RedisAuditSink::new("redis://127.0.0.1:6379", "classification_logs_test", Some(60))
            .await
            .expect("Failed to connect to Redis");

        let record = sample_record();
        sink.put(&record).await.unwrap();

        let mut conn = sink.redis.clone();
        let category: String = redis::cmd("HGET")
            .arg(sink.record_key(&record))
            .arg("category")
            .query_async(&mut conn)
            .await
            .unwrap();
        assert_eq!(category, "rec.sport.baseball");
    }

    #[tokio::test]
    #[ignore = "Requires Redis"]
    async fn test_concurrent_puts_share_connection() {
        let sink = RedisAuditSink::new("redis://127.0.0.1:6379", "classification_logs_test", Some(60))
            .await
            .expect("Failed to connect to Redis");
        assert!(sink.health_check().await.unwrap());

        let (a, b, c) = (sample_record(), sample_record(), sample_record());
        let (ra, rb, rc) = tokio::join!(sink.put(&a), sink.put(&b), sink.put(&c));
        ra.unwrap();
        rb.unwrap();
        rc.unwrap();
    }
}
