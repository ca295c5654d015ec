//! Per-movement exclusive locks.

use crate::domain::MovementId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry of one async mutex per movement id.
///
/// The guard returned by [`MovementLocks::acquire`] releases the lock when
/// dropped, so every exit path of the caller unlocks. Entries nobody holds or
/// waits on are pruned on the next acquisition.
#[derive(Debug, Default)]
pub struct MovementLocks {
    entries: Mutex<HashMap<MovementId, Arc<AsyncMutex<()>>>>,
}

impl MovementLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `movement_id`.
    pub async fn acquire(&self, movement_id: &MovementId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut entries = self
                .entries
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            entries.retain(|id, lock| id == movement_id || Arc::strong_count(lock) > 1);
            entries
                .entry(movement_id.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of tracked entries.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .map(|entries| entries.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_movement_is_exclusive() {
        let locks = Arc::new(MovementLocks::new());
        let id = MovementId::new("m-1");

        let guard = locks.acquire(&id).await;

        let contender = {
            let locks = locks.clone();
            let id = id.clone();
            tokio::spawn(async move {
                let _g = locks.acquire(&id).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("lock was not released")
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_movements_do_not_block() {
        let locks = MovementLocks::new();
        let _a = locks.acquire(&MovementId::new("m-1")).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(&MovementId::new("m-2"))).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_released_entries_are_pruned() {
        let locks = MovementLocks::new();
        for i in 0..10 {
            let _g = locks.acquire(&MovementId::new(format!("m-{i}"))).await;
        }
        assert!(locks.len() <= 1);
    }
}
