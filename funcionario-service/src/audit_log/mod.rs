//! Audit log of employee mutations
//!
//! Every create/update/delete writes one [`AuditLogEntry`] holding a
//! denormalized snapshot of the employee. Entries are addressed by a
//! (partition key, row key) pair: the partition key is the employee's
//! department and the row key a fresh UUID, so entries never overwrite each
//! other and can be listed per department.
//!
//! # Available Backends
//!
//! - [`RedisAuditLogStore`]: one hash per partition plus a partition index set
//! - [`InMemoryAuditLogStore`]: process-local, for tests and local runs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::employee::Employee;
use crate::error::AuditLogError;

pub mod memory;
pub mod redis_table;

pub use memory::InMemoryAuditLogStore;
pub use redis_table::RedisAuditLogStore;

/// Why a log entry was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    #[serde(rename = "Inclusao")]
    Insertion,
    #[serde(rename = "Atualizacao")]
    Update,
    #[serde(rename = "Remocao")]
    Removal,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insertion => write!(f, "Inclusao"),
            Self::Update => write!(f, "Atualizacao"),
            Self::Removal => write!(f, "Remocao"),
        }
    }
}

/// One immutable audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    /// Department of the employee at the time of the action
    pub partition_key: String,

    /// Unique, unordered identifier of the entry
    pub row_key: String,

    pub action: ActionKind,

    /// Set by the store when the entry is written
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,

    /// Employee fields as they were when the action happened
    #[serde(flatten)]
    pub employee: Employee,
}

impl AuditLogEntry {
    /// Snapshot `employee` for `action` under a freshly generated row key
    pub fn new(employee: &Employee, action: ActionKind) -> Self {
        Self {
            partition_key: employee.department().to_string(),
            row_key: Uuid::new_v4().to_string(),
            action,
            timestamp: None,
            employee: employee.clone(),
        }
    }
}

/// Trait for audit log persistence backends
///
/// Implementations call [`ensure_table`](AuditLogStore::ensure_table) before
/// every other operation; nothing caches whether the table already exists.
#[async_trait]
pub trait AuditLogStore: Send + Sync {
    /// Create the backing table if it does not exist yet (idempotent)
    async fn ensure_table(&self) -> Result<(), AuditLogError>;

    /// Insert or replace the entry at (partition key, row key)
    async fn upsert(&self, entry: AuditLogEntry) -> Result<(), AuditLogError>;

    /// Every entry, in store-defined order
    async fn query_all(&self) -> Result<Vec<AuditLogEntry>, AuditLogError>;

    /// Entries whose partition key equals `partition_key` exactly
    async fn query_by_partition(
        &self,
        partition_key: &str,
    ) -> Result<Vec<AuditLogEntry>, AuditLogError>;
}
