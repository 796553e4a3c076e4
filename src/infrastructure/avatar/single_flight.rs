//! Single-flight: collapse concurrent calls for the same key into one

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::domain::DomainError;

type SharedCall<V> = Shared<BoxFuture<'static, Result<V, DomainError>>>;

/// Deduplicates concurrent work per key
///
/// The first caller for a key spawns the work on the runtime; callers arriving
/// while it runs await the same result. The spawned task owns the work, so a
/// caller dropping its future does not cancel the call for the others. Once
/// the work finishes the key is released and the next call starts afresh.
pub struct SingleFlight<K, V> {
    calls: Arc<Mutex<HashMap<K, SharedCall<V>>>>,
}

impl<K, V> Clone for SingleFlight<K, V> {
    fn clone(&self) -> Self {
        Self {
            calls: Arc::clone(&self.calls),
        }
    }
}

impl<K, V> Default for SingleFlight<K, V> {
    fn default() -> Self {
        Self {
            calls: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K, V> std::fmt::Debug for SingleFlight<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleFlight").finish_non_exhaustive()
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` for `key`, or join the call already in flight
    ///
    /// `work` is only invoked by the caller that starts a new flight.
    pub async fn run<F, Fut>(&self, key: K, work: F) -> Result<V, DomainError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, DomainError>> + Send + 'static,
    {
        let call = {
            let mut calls = lock(&self.calls);

            match calls.get(&key) {
                Some(existing) => {
                    tracing::debug!("Joining in-flight call");
                    existing.clone()
                }
                None => {
                    let call = self.start(key.clone(), work());
                    calls.insert(key, call.clone());
                    call
                }
            }
        };

        call.await
    }

    /// Number of keys with work currently in flight
    pub fn in_flight(&self) -> usize {
        lock(&self.calls).len()
    }

    fn start<Fut>(&self, key: K, work: Fut) -> SharedCall<V>
    where
        Fut: Future<Output = Result<V, DomainError>> + Send + 'static,
    {
        let calls = Arc::clone(&self.calls);

        // The entry is inserted under the same lock the task needs for removal,
        // so the task can never remove before the insert.
        let handle = tokio::spawn(async move {
            let result = work.await;
            lock(&calls).remove(&key);
            result
        });

        async move {
            handle.await.unwrap_or_else(|e| {
                Err(DomainError::internal(format!("In-flight call failed: {}", e)))
            })
        }
        .boxed()
        .shared()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
