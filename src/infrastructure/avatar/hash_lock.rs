use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::avatar::ContentHash;

/// Keyed async locks, one per content hash
///
/// Serialises the write-then-associate and count-then-delete sequences for a
/// hash. Entries nobody holds or awaits are pruned on the next acquisition.
#[derive(Debug, Default)]
pub struct HashLocks {
    locks: Mutex<HashMap<ContentHash, Arc<AsyncMutex<()>>>>,
}

impl HashLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, hash: &ContentHash) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(hash.clone()).or_default())
        };

        lock.lock_owned().await
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
