//! Redis-backed audit log table
//!
//! Layout for a table `T`:
//! - `tables`: set of every table created through this store
//! - `T:partitions`: set of partition keys written to `T`
//! - `T:p:<partition>`: hash of row key -> JSON entry
//!
//! `HSET` replaces an existing row key, which gives upsert semantics.

use async_trait::async_trait;
use chrono::Utc;
use deadpool_redis::{Config as DeadpoolConfig, Pool, Runtime};
use redis::AsyncCommands;
use std::time::Duration;

use super::{AuditLogEntry, AuditLogStore};
use crate::config::AuditLogConfig;
use crate::error::{AuditLogError, Error, Result};

const TABLES_KEY: &str = "tables";

/// Audit log table stored in Redis
#[derive(Clone)]
pub struct RedisAuditLogStore {
    pool: Pool,
    table: String,
}

impl RedisAuditLogStore {
    /// Create a store over an existing pool
    pub fn new(pool: Pool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    /// Connect using the audit log configuration
    pub async fn connect(config: &AuditLogConfig) -> Result<Self> {
        let url = config.connection_string().ok_or_else(|| {
            Error::Internal("Audit log connection string is not configured".to_string())
        })?;
        let pool = create_pool(url, config).await?;
        Ok(Self::new(pool, config.effective_table_name()))
    }

    fn partitions_key(&self) -> String {
        format!("{}:partitions", self.table)
    }

    fn partition_key(&self, partition: &str) -> String {
        format!("{}:p:{}", self.table, partition)
    }

    async fn connection(&self) -> std::result::Result<deadpool_redis::Connection, AuditLogError> {
        Ok(self.pool.get().await?)
    }
}

fn parse_entries(raw: Vec<String>) -> std::result::Result<Vec<AuditLogEntry>, AuditLogError> {
    raw.iter()
        .map(|json| serde_json::from_str(json).map_err(AuditLogError::from))
        .collect()
}

#[async_trait]
impl AuditLogStore for RedisAuditLogStore {
    async fn ensure_table(&self) -> std::result::Result<(), AuditLogError> {
        let mut conn = self.connection().await?;
        let added: i64 = conn.sadd(TABLES_KEY, &self.table).await?;
        if added > 0 {
            tracing::info!(table = %self.table, "Created audit log table");
        }
        Ok(())
    }

    async fn upsert(&self, mut entry: AuditLogEntry) -> std::result::Result<(), AuditLogError> {
        self.ensure_table().await?;

        entry.timestamp = Some(Utc::now());
        let json = serde_json::to_string(&entry)?;

        let mut conn = self.connection().await?;
        redis::pipe()
            .atomic()
            .hset(self.partition_key(&entry.partition_key), &entry.row_key, json)
            .ignore()
            .sadd(self.partitions_key(), &entry.partition_key)
            .ignore()
            .query_async::<()>(&mut conn)
            .await?;

        tracing::debug!(
            table = %self.table,
            partition = %entry.partition_key,
            row = %entry.row_key,
            "Audit log entry written"
        );
        Ok(())
    }

    async fn query_all(&self) -> std::result::Result<Vec<AuditLogEntry>, AuditLogError> {
        self.ensure_table().await?;

        let mut conn = self.connection().await?;
        let partitions: Vec<String> = conn.smembers(self.partitions_key()).await?;
        if partitions.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for partition in &partitions {
            pipe.hvals(self.partition_key(partition));
        }
        let rows: Vec<Vec<String>> = pipe.query_async(&mut conn).await?;

        parse_entries(rows.into_iter().flatten().collect())
    }

    async fn query_by_partition(
        &self,
        partition_key: &str,
    ) -> std::result::Result<Vec<AuditLogEntry>, AuditLogError> {
        self.ensure_table().await?;

        let mut conn = self.connection().await?;
        let raw: Vec<String> = conn.hvals(self.partition_key(partition_key)).await?;

        parse_entries(raw)
    }
}

/// Create a Redis connection pool with retry logic
///
/// Uses exponential backoff between attempts.
pub(crate) async fn create_pool(url: &str, config: &AuditLogConfig) -> Result<Pool> {
    let mut attempt = 0;
    let base_delay = Duration::from_secs(config.retry_delay_secs);

    loop {
        match try_create_pool(url, config).await {
            Ok(pool) => {
                if attempt > 0 {
                    tracing::info!(
                        "Audit log store connection established after {} attempt(s)",
                        attempt + 1
                    );
                } else {
                    tracing::info!(
                        "Audit log store pool created: max_connections={}",
                        config.max_connections
                    );
                }
                return Ok(pool);
            }
            Err(e) => {
                attempt += 1;

                if attempt > config.max_retries {
                    tracing::error!(
                        "Failed to connect to audit log store after {} attempts: {}",
                        config.max_retries + 1,
                        e
                    );
                    return Err(e);
                }

                let delay = base_delay * 2_u32.pow(attempt.saturating_sub(1));

                tracing::warn!(
                    "Audit log store connection attempt {} failed: {}. Retrying in {:?}...",
                    attempt,
                    e,
                    delay
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Attempt to create a Redis pool (single try)
async fn try_create_pool(url: &str, config: &AuditLogConfig) -> Result<Pool> {
    let pool = DeadpoolConfig::from_url(url)
        .builder()
        .map_err(|e| Error::Internal(format!("Failed to build audit log pool: {}", e)))?
        .max_size(config.max_connections)
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create audit log pool: {}", e)))?;

    // Test the connection
    let conn = pool
        .get()
        .await
        .map_err(|e| Error::Internal(format!("Failed to get audit log connection: {}", e)))?;
    drop(conn);

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let pool = DeadpoolConfig::from_url("redis://127.0.0.1:6379")
            .create_pool(Some(Runtime::Tokio1))
            .unwrap();
        let store = RedisAuditLogStore::new(pool, "FuncionarioLog");

        assert_eq!(store.partitions_key(), "FuncionarioLog:partitions");
        assert_eq!(store.partition_key("TI"), "FuncionarioLog:p:TI");
    }

    #[test]
    fn test_parse_entries_rejects_garbage() {
        let err = parse_entries(vec!["not json".to_string()]).unwrap_err();
        assert!(matches!(err, AuditLogError::Serialization(_)));
    }
}
