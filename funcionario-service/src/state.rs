//! Application state management

use std::sync::Arc;

use crate::audit_log::{AuditLogStore, InMemoryAuditLogStore, RedisAuditLogStore};
use crate::config::Config;
use crate::error::Result;
use crate::store::{EmployeeStore, InMemoryEmployeeStore, PgEmployeeStore};

/// Application state shared across handlers
///
/// Cloning is cheap: everything sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    employees: Arc<dyn EmployeeStore>,
    audit_log: Arc<dyn AuditLogStore>,
}

impl AppState {
    /// Create state from already constructed stores
    pub fn new(
        config: Config,
        employees: Arc<dyn EmployeeStore>,
        audit_log: Arc<dyn AuditLogStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            employees,
            audit_log,
        }
    }

    /// State backed by the in-memory stores
    pub fn in_memory(config: Config) -> Self {
        Self::new(
            config,
            Arc::new(InMemoryEmployeeStore::new()),
            Arc::new(InMemoryAuditLogStore::new()),
        )
    }

    /// Create a new builder for AppState
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::new()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Record store for employee entities
    pub fn employees(&self) -> &dyn EmployeeStore {
        self.employees.as_ref()
    }

    /// Audit log table store
    pub fn audit_log(&self) -> &dyn AuditLogStore {
        self.audit_log.as_ref()
    }
}

/// Builder for AppState
///
/// Stores that are not supplied explicitly are created from the
/// configuration: PostgreSQL when `database` is set, Redis when
/// `audit_log.connection_string` is set, in-memory otherwise.
#[derive(Default)]
pub struct AppStateBuilder {
    config: Option<Config>,
    employees: Option<Arc<dyn EmployeeStore>>,
    audit_log: Option<Arc<dyn AuditLogStore>>,
}

impl AppStateBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Use the given record store instead of one built from configuration
    pub fn employees(mut self, store: Arc<dyn EmployeeStore>) -> Self {
        self.employees = Some(store);
        self
    }

    /// Use the given audit log store instead of one built from configuration
    pub fn audit_log(mut self, store: Arc<dyn AuditLogStore>) -> Self {
        self.audit_log = Some(store);
        self
    }

    /// Build the AppState, connecting to configured stores
    pub async fn build(self) -> Result<AppState> {
        let config = self.config.unwrap_or_default();

        let employees: Arc<dyn EmployeeStore> = match self.employees {
            Some(store) => store,
            None => match &config.database {
                Some(db_config) => Arc::new(PgEmployeeStore::connect(db_config).await?),
                None => {
                    tracing::warn!("No database configured, employees are kept in memory");
                    Arc::new(InMemoryEmployeeStore::new())
                }
            },
        };

        let audit_log: Arc<dyn AuditLogStore> = match self.audit_log {
            Some(store) => store,
            None if config.audit_log.connection_string().is_some() => {
                Arc::new(RedisAuditLogStore::connect(&config.audit_log).await?)
            }
            None => {
                tracing::warn!("No audit log connection string configured, audit log is kept in memory");
                Arc::new(InMemoryAuditLogStore::new())
            }
        };

        Ok(AppState::new(config, employees, audit_log))
    }
}
