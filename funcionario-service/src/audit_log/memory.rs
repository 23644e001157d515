//! In-memory audit log table

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use super::{AuditLogEntry, AuditLogStore};
use crate::error::AuditLogError;

type Partitions = BTreeMap<String, BTreeMap<String, AuditLogEntry>>;

/// Process-local audit log, partitioned the same way as the Redis table
#[derive(Default)]
pub struct InMemoryAuditLogStore {
    partitions: RwLock<Partitions>,
    ensure_calls: AtomicUsize,
}

impl InMemoryAuditLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `ensure_table` ran
    pub fn ensure_table_calls(&self) -> usize {
        self.ensure_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl AuditLogStore for InMemoryAuditLogStore {
    async fn ensure_table(&self) -> Result<(), AuditLogError> {
        self.ensure_calls.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn upsert(&self, mut entry: AuditLogEntry) -> Result<(), AuditLogError> {
        self.ensure_table().await?;

        entry.timestamp = Some(Utc::now());
        self.partitions
            .write()
            .await
            .entry(entry.partition_key.clone())
            .or_default()
            .insert(entry.row_key.clone(), entry);
        Ok(())
    }

    async fn query_all(&self) -> Result<Vec<AuditLogEntry>, AuditLogError> {
        self.ensure_table().await?;

        Ok(self
            .partitions
            .read()
            .await
            .values()
            .flat_map(|rows| rows.values().cloned())
            .collect())
    }

    async fn query_by_partition(
        &self,
        partition_key: &str,
    ) -> Result<Vec<AuditLogEntry>, AuditLogError> {
        self.ensure_table().await?;

        Ok(self
            .partitions
            .read()
            .await
            .get(partition_key)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit_log::ActionKind;
    use crate::employee::Employee;

    fn employee(department: &str) -> Employee {
        Employee {
            id: 1,
            name: Some("Ana".into()),
            department: Some(department.into()),
            ..Employee::default()
        }
    }

    #[tokio::test]
    async fn test_upsert_stamps_and_partitions() {
        let store = InMemoryAuditLogStore::new();
        store
            .upsert(AuditLogEntry::new(&employee("TI"), ActionKind::Insertion))
            .await
            .unwrap();
        store
            .upsert(AuditLogEntry::new(&employee("RH"), ActionKind::Update))
            .await
            .unwrap();
        store
            .upsert(AuditLogEntry::new(&employee("TI"), ActionKind::Removal))
            .await
            .unwrap();

        let all = store.query_all().await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|e| e.timestamp.is_some()));

        let ti = store.query_by_partition("TI").await.unwrap();
        assert_eq!(ti.len(), 2);
        assert!(ti.iter().all(|e| e.partition_key == "TI"));

        // exact, case-sensitive match
        assert!(store.query_by_partition("ti").await.unwrap().is_empty());
        assert!(store.query_by_partition("Financeiro").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_row_key() {
        let store = InMemoryAuditLogStore::new();
        let mut entry = AuditLogEntry::new(&employee("TI"), ActionKind::Insertion);
        store.upsert(entry.clone()).await.unwrap();

        entry.action = ActionKind::Update;
        store.upsert(entry.clone()).await.unwrap();

        let all = store.query_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].action, ActionKind::Update);
    }

    #[tokio::test]
    async fn test_every_operation_ensures_table() {
        let store = InMemoryAuditLogStore::new();
        store
            .upsert(AuditLogEntry::new(&employee("TI"), ActionKind::Insertion))
            .await
            .unwrap();
        store.query_all().await.unwrap();
        store.query_by_partition("TI").await.unwrap();

        assert_eq!(store.ensure_table_calls(), 3);
    }
}
