use crate::models::AuditRecord;
use crate::services::audit::{validate_table_name, AuditSink, SinkError};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// PostgreSQL audit sink
///
/// Appends one row per classification to a single table. The table is
/// created on connect if it does not exist.
pub struct PostgresAuditSink {
    pool: PgPool,
    insert_sql: String,
}

impl PostgresAuditSink {
    /// Connect to PostgreSQL and make sure the audit table exists
    pub async fn new(
        database_url: &str,
        table: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, SinkError> {
        validate_table_name(table)?;

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(0)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await?;

        sqlx::query(&create_table_sql(table)).execute(&pool).await?;

        tracing::info!("PostgreSQL audit sink ready (table: {})", table);

        Ok(Self {
            pool,
            insert_sql: insert_sql(table),
        })
    }
}

fn create_table_sql(table: &str) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS "{}" (
            id UUID PRIMARY KEY,
            "timestamp" DOUBLE PRECISION NOT NULL,
            text TEXT NOT NULL,
            category TEXT NOT NULL,
            confidence DOUBLE PRECISION NOT NULL,
            request_id TEXT NOT NULL
        )
        "#,
        table
    )
}

fn insert_sql(table: &str) -> String {
    format!(
        r#"INSERT INTO "{}" (id, "timestamp", text, category, confidence, request_id)
        VALUES ($1, $2, $3, $4, $5, $6)"#,
        table
    )
}

#[async_trait]
impl AuditSink for PostgresAuditSink {
    async fn put(&self, record: &AuditRecord) -> Result<(), SinkError> {
        sqlx::query(&self.insert_sql)
            .bind(record.id)
            .bind(record.timestamp)
            .bind(&record.text)
            .bind(&record.category)
            .bind(record.confidence)
            .bind(&record.request_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn health_check(&self) -> Result<bool, SinkError> {
        let result: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&self.pool).await?;
        Ok(result.0 == 1)
    }
}
