//! Per-namespace coordination between ingestion and delete-all.
//!
//! Ingestions into one namespace share a read guard and may run together.
//! Delete-all takes the write guard, so it waits for running ingestions and
//! blocks new ones until it is done. Queries take no guard.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

#[derive(Default)]
pub struct NamespaceLocks {
    locks: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl NamespaceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, namespace: &str) -> Arc<RwLock<()>> {
        self.locks
            .lock()
            .entry(namespace.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    /// Guard held for the duration of an additive operation.
    pub async fn ingest(&self, namespace: &str) -> OwnedRwLockReadGuard<()> {
        self.lock_for(namespace).read_owned().await
    }

    /// Guard held for the duration of a destructive operation.
    pub async fn delete(&self, namespace: &str) -> OwnedRwLockWriteGuard<()> {
        self.lock_for(namespace).write_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_ingests_share_the_namespace() {
        let locks = NamespaceLocks::new();
        let _a = locks.ingest("books").await;
        let b = tokio::time::timeout(Duration::from_millis(50), locks.ingest("books")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_delete_waits_for_ingest() {
        let locks = NamespaceLocks::new();
        let ingest = locks.ingest("books").await;

        let blocked = tokio::time::timeout(Duration::from_millis(50), locks.delete("books")).await;
        assert!(blocked.is_err());

        drop(ingest);
        let delete = tokio::time::timeout(Duration::from_millis(50), locks.delete("books")).await;
        assert!(delete.is_ok());
    }

    #[tokio::test]
    async fn test_namespaces_are_independent() {
        let locks = NamespaceLocks::new();
        let _delete = locks.delete("books").await;
        let other = tokio::time::timeout(Duration::from_millis(50), locks.ingest("papers")).await;
        assert!(other.is_ok());
    }
}
