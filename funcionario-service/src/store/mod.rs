//! Record store for employee entities
//!
//! A pure persistence boundary: no validation happens here. Callers load and
//! check existence before calling [`update`](EmployeeStore::update) or
//! [`remove`](EmployeeStore::remove).
//!
//! # Available Backends
//!
//! - [`PgEmployeeStore`]: PostgreSQL through a sqlx pool
//! - [`InMemoryEmployeeStore`]: process-local, for tests and local runs

use async_trait::async_trait;

use crate::employee::{Employee, EmployeeId};
use crate::error::StoreError;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryEmployeeStore;
pub use postgres::PgEmployeeStore;

/// Result type for record store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Trait for employee persistence backends
#[async_trait]
pub trait EmployeeStore: Send + Sync {
    /// Load an employee by id, `None` if absent
    async fn find(&self, id: EmployeeId) -> StoreResult<Option<Employee>>;

    /// Persist a new employee and return it with its assigned id
    ///
    /// The incoming id is ignored.
    async fn add(&self, employee: Employee) -> StoreResult<Employee>;

    /// Overwrite every mutable field of an existing employee
    async fn update(&self, employee: &Employee) -> StoreResult<()>;

    /// Delete an existing employee
    async fn remove(&self, id: EmployeeId) -> StoreResult<()>;

    /// Liveness check
    ///
    /// Returns `Ok(false)` when the store cannot be reached; other failures
    /// are returned as errors.
    async fn can_connect(&self) -> StoreResult<bool>;
}
