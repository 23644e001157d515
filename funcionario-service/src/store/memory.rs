//! In-memory record store

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{EmployeeStore, StoreResult};
use crate::employee::{Employee, EmployeeId};

#[derive(Default)]
struct Table {
    rows: BTreeMap<EmployeeId, Employee>,
    last_id: EmployeeId,
}

/// Process-local employee table with sequential ids starting at 1
#[derive(Default)]
pub struct InMemoryEmployeeStore {
    table: RwLock<Table>,
}

impl InMemoryEmployeeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored employees
    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl EmployeeStore for InMemoryEmployeeStore {
    async fn find(&self, id: EmployeeId) -> StoreResult<Option<Employee>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn add(&self, mut employee: Employee) -> StoreResult<Employee> {
        let mut table = self.table.write().await;
        table.last_id += 1;
        employee.id = table.last_id;
        table.rows.insert(employee.id, employee.clone());
        Ok(employee)
    }

    async fn update(&self, employee: &Employee) -> StoreResult<()> {
        self.table
            .write()
            .await
            .rows
            .insert(employee.id, employee.clone());
        Ok(())
    }

    async fn remove(&self, id: EmployeeId) -> StoreResult<()> {
        self.table.write().await.rows.remove(&id);
        Ok(())
    }

    async fn can_connect(&self) -> StoreResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee(name: &str) -> Employee {
        Employee {
            name: Some(name.into()),
            department: Some("TI".into()),
            ..Employee::default()
        }
    }

    #[tokio::test]
    async fn test_add_assigns_sequential_ids() {
        let store = InMemoryEmployeeStore::new();
        let first = store.add(employee("Ana")).await.unwrap();
        let second = store.add(Employee { id: 40, ..employee("Bruno") }).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(store.find(2).await.unwrap().unwrap().name.as_deref(), Some("Bruno"));
        assert!(store.find(40).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_remove() {
        let store = InMemoryEmployeeStore::new();
        let first = store.add(employee("Ana")).await.unwrap();
        store.remove(first.id).await.unwrap();
        assert!(store.is_empty().await);

        let second = store.add(employee("Bruno")).await.unwrap();
        assert_eq!(second.id, 2);
    }

    #[tokio::test]
    async fn test_update_overwrites_row() {
        let store = InMemoryEmployeeStore::new();
        let mut stored = store.add(employee("Ana")).await.unwrap();
        stored.salary = 4200.0;
        store.update(&stored).await.unwrap();

        assert_eq!(store.find(stored.id).await.unwrap().unwrap().salary, 4200.0);
        assert!(store.can_connect().await.unwrap());
    }
}
