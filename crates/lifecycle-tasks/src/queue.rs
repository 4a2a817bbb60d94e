//! Cluster-state task queue adapter (§4.7).
//!
//! Two queues are used by the controller, each with its own priority: one for force-merge
//! completion stamps (LOW — best effort bookkeeping), one for downsample-into-stream swaps
//! (NORMAL — changes what the data stream actually reads/writes). Both are modelled by this
//! single adapter parameterised by [`Priority`]; `lifecycle-run` owns the two queue instances.
use std::sync::Arc;

use async_trait::async_trait;

use replicore_lifecycle_context::Context;

/// Relative priority of a submitted cluster-state mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Priority {
    Low,
    Normal,
}

/// The cluster-state mutations this controller ever submits.
///
/// Each submission produces `(newState, resultValue)` inside the real cluster-state task
/// executor (Design Note: "Batched cluster-state executor callback"); this controller only
/// consumes the submission side of that interface, so only the mutation description is modelled
/// here, not the executor itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClusterStateMutation {
    /// Stamp `force_merge_completed_timestamp` into an index's lifecycle custom metadata,
    /// preserving any other keys already present under that namespace.
    StampForceMergeCompleted {
        index_name: String,
        timestamp_millis: i64,
    },

    /// Replace the source index with its downsample product in a data stream's backing indices.
    SwapDownsampleIntoStream {
        stream_name: String,
        source_index: String,
        downsample_index: String,
    },
}

/// Enqueue batched cluster-state mutations with priority.
#[derive(Clone)]
pub struct ClusterStateTaskQueue {
    inner: Arc<dyn ClusterStateTaskQueueBackend>,
}

impl ClusterStateTaskQueue {
    pub async fn submit(
        &self,
        context: &Context,
        priority: Priority,
        mutation: ClusterStateMutation,
    ) -> anyhow::Result<()> {
        self.inner.submit(context, priority, mutation).await
    }
}

impl<T> From<T> for ClusterStateTaskQueue
where
    T: ClusterStateTaskQueueBackend + 'static,
{
    fn from(value: T) -> Self {
        ClusterStateTaskQueue {
            inner: Arc::new(value),
        }
    }
}

/// Operations implemented by the cluster's batched cluster-state task executor.
#[async_trait]
pub trait ClusterStateTaskQueueBackend: Send + Sync {
    async fn submit(
        &self,
        context: &Context,
        priority: Priority,
        mutation: ClusterStateMutation,
    ) -> anyhow::Result<()>;
}

#[cfg(any(test, feature = "test-fixture"))]
mod fixture {
    use tokio::sync::broadcast;
    use tokio::sync::broadcast::Receiver;
    use tokio::sync::broadcast::Sender;

    use super::*;

    /// Introspection tool for cluster-state mutations submitted during unit tests.
    pub struct ClusterStateTaskQueueFixture {
        submitted: Receiver<(Priority, ClusterStateMutation)>,
        send: Sender<(Priority, ClusterStateMutation)>,
    }

    impl Default for ClusterStateTaskQueueFixture {
        fn default() -> Self {
            let (send, submitted) = broadcast::channel(64);
            Self { submitted, send }
        }
    }

    impl ClusterStateTaskQueueFixture {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn backend(&self) -> ClusterStateTaskQueue {
            ClusterStateTaskQueueBackendFixture {
                send: self.send.clone(),
            }
            .into()
        }

        pub async fn pop(&mut self) -> (Priority, ClusterStateMutation) {
            self.submitted.recv().await.expect("fixture sender dropped")
        }
    }

    struct ClusterStateTaskQueueBackendFixture {
        send: Sender<(Priority, ClusterStateMutation)>,
    }

    #[async_trait]
    impl ClusterStateTaskQueueBackend for ClusterStateTaskQueueBackendFixture {
        async fn submit(
            &self,
            _context: &Context,
            priority: Priority,
            mutation: ClusterStateMutation,
        ) -> anyhow::Result<()> {
            self.send.send((priority, mutation))?;
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-fixture"))]
pub use self::fixture::ClusterStateTaskQueueFixture;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn submitted_mutation_is_observable() {
        let mut fixture = ClusterStateTaskQueueFixture::new();
        let queue = fixture.backend();
        let context = Context::fixture();
        queue
            .submit(
                &context,
                Priority::Low,
                ClusterStateMutation::StampForceMergeCompleted {
                    index_name: "idx-1".into(),
                    timestamp_millis: 1234,
                },
            )
            .await
            .unwrap();
        let (priority, mutation) = fixture.pop().await;
        assert_eq!(priority, Priority::Low);
        assert_eq!(
            mutation,
            ClusterStateMutation::StampForceMergeCompleted {
                index_name: "idx-1".into(),
                timestamp_millis: 1234,
            }
        );
    }
}
