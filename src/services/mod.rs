//! Services (C6-C9): the operator-facing layer built on top of the store,
//! matcher, and catalog clients. Each service owns one subsystem's business
//! rules; orchestration across them lives in `workflow`.

pub mod association_checker;
pub mod quality_scan_cache;
pub mod transfer_service;
pub mod validation_service;
pub mod workflow;

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-key mutual exclusion (§4.4: "Validation operations are serialized
/// per `pending_id`; reads are concurrent"). Keys accumulate for the life
/// of the process rather than being evicted — the working set is bounded
/// by the number of distinct pending/series ids touched in a session, so
/// the map never grows unboundedly in practice.
pub struct KeyedLocks<K> {
    table: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: K) -> OwnedMutexGuard<()> {
        let entry = {
            let mut table = self.table.lock().await;
            table.entry(key).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
        };
        entry.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn distinct_keys_do_not_block_each_other() {
        let locks: KeyedLocks<i32> = KeyedLocks::new();
        let guard_a = locks.lock(1).await;
        let guard_b = tokio::time::timeout(std::time::Duration::from_millis(50), locks.lock(2)).await;
        assert!(guard_b.is_ok());
        drop(guard_a);
    }

    #[tokio::test]
    async fn same_key_serializes() {
        let locks: KeyedLocks<i32> = KeyedLocks::new();
        let guard_a = locks.lock(7).await;
        let blocked = tokio::time::timeout(std::time::Duration::from_millis(50), locks.lock(7)).await;
        assert!(blocked.is_err());
        drop(guard_a);
    }
}
