//! At-most-one in-flight request deduplication (§4.2).
//!
//! Two independent instances are expected to exist in the controller: one keyed by transport
//! request identity, one keyed by cluster-state task identity (see `lifecycle-transport` and
//! `lifecycle-run` respectively). Both share this same generic implementation.
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;

use tokio::sync::broadcast;
use tokio::sync::Mutex;

/// At-most-one in-flight operation per logical key; fans completion out to every caller that
/// joined while the operation was in flight.
///
/// Keys must have value-based equality/hash that ignores request bookkeeping fields (request id,
/// parent task, UUID, ...) — see the dedicated `*Key` projection types in `lifecycle-transport`
/// and `lifecycle-run` for how callers are expected to build `K`.
pub struct RequestDeduplicator<K, V> {
    inflight: Mutex<HashMap<K, broadcast::Sender<V>>>,
}

impl<K, V> Default for RequestDeduplicator<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> RequestDeduplicator<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` for `key` unless an equal key is already in flight, in which case wait for
    /// that in-flight action's result instead of starting a second one.
    ///
    /// Every concurrent caller for the same key, including the one whose call happens to trigger
    /// `action`, receives the same result value.
    pub async fn execute_once<F, Fut>(&self, key: K, action: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        // Join an already in-flight request for this key, if there is one.
        let mut guard = self.inflight.lock().await;
        if let Some(sender) = guard.get(&key) {
            let mut receiver = sender.subscribe();
            drop(guard);
            return receiver
                .recv()
                .await
                .expect("dedup sender dropped before broadcasting a result");
        }

        // Become the owner of this key: register the completion channel before releasing the
        // lock so every caller arriving afterwards joins this action instead of starting another.
        let (sender, _keep_alive) = broadcast::channel(1);
        guard.insert(key.clone(), sender.clone());
        drop(guard);

        let result = action().await;

        // Remove the entry before broadcasting: a caller joining after this point must start
        // (and dedupe against) a fresh action, not one that has already finished.
        self.inflight.lock().await.remove(&key);

        // A send error only means no one subscribed; we already hold `result` regardless.
        let _ = sender.send(result.clone());
        result
    }

    /// Number of distinct keys currently in flight.
    pub async fn len(&self) -> usize {
        self.inflight.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop all in-flight entries without waiting for completion or notifying callers.
    ///
    /// Used on mastership loss: pending responses become no-ops from the controller's
    /// perspective, and the next election must be free to re-issue the same requests rather than
    /// wait forever on an entry whose owner is gone.
    pub async fn clear(&self) {
        self.inflight.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    use super::RequestDeduplicator;

    #[tokio::test]
    async fn concurrent_callers_collapse_to_one_action() {
        let dedup: Arc<RequestDeduplicator<&'static str, u32>> =
            Arc::new(RequestDeduplicator::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let dedup = dedup.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                dedup
                    .execute_once("downsample-idx-1-1h", || {
                        let calls = calls.clone();
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            42
                        }
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(dedup.is_empty().await);
    }

    #[tokio::test]
    async fn sequential_calls_run_action_each_time() {
        let dedup: RequestDeduplicator<&'static str, u32> = RequestDeduplicator::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = calls.clone();
            dedup
                .execute_once("idx-1", || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    1
                })
                .await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn clear_drops_inflight_without_blocking_waiters() {
        let dedup: RequestDeduplicator<&'static str, u32> = RequestDeduplicator::new();
        // No waiters registered: clear on an empty deduplicator must be a safe no-op.
        dedup.clear().await;
        assert!(dedup.is_empty().await);
    }
}
