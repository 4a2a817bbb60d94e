//! Deduplicated submission of the two cluster-state mutations this controller issues (§4.7).
use std::sync::Arc;

use replicore_lifecycle_context::Context;
use replicore_lifecycle_dedup::RequestDeduplicator;
use replicore_lifecycle_tasks::ClusterStateMutation;
use replicore_lifecycle_tasks::ClusterStateTaskQueue;
use replicore_lifecycle_tasks::Priority;

/// Deduplication key for cluster-state task submissions: a pure projection of "what this task
/// does", matching the same pattern as `lifecycle-transport`'s `TransportKey` (§4.2, Design Note 3).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ClusterTaskKey {
    StampForceMergeCompleted { index_name: String },
    SwapDownsampleIntoStream { stream_name: String, downsample_index: String },
}

type Outcome = Result<(), String>;

/// Deduplicated, idempotence-aware facade over [`ClusterStateTaskQueue`].
///
/// Mirrors `lifecycle-transport`'s `TransportClient`: collapses concurrent submissions of the
/// "same" mutation (e.g. two runs racing to stamp the same index's completion timestamp) into a
/// single queue submission.
#[derive(Clone)]
pub struct ClusterTaskClient {
    queue: ClusterStateTaskQueue,
    dedup: Arc<RequestDeduplicator<ClusterTaskKey, Outcome>>,
}

impl ClusterTaskClient {
    pub fn new(queue: ClusterStateTaskQueue) -> Self {
        Self {
            queue,
            dedup: Arc::new(RequestDeduplicator::new()),
        }
    }

    pub async fn clear_inflight(&self) {
        self.dedup.clear().await;
    }

    pub async fn inflight_count(&self) -> usize {
        self.dedup.len().await
    }

    /// Stamp `force_merge_completed_timestamp` into an index's lifecycle custom metadata (§4.5).
    pub async fn stamp_force_merge_completed(
        &self,
        context: &Context,
        index_name: &str,
        timestamp_millis: i64,
    ) -> Outcome {
        let key = ClusterTaskKey::StampForceMergeCompleted {
            index_name: index_name.to_string(),
        };
        let queue = self.queue.clone();
        let context = context.clone();
        let index_name = index_name.to_string();
        self.dedup
            .execute_once(key, || async move {
                queue
                    .submit(
                        &context,
                        Priority::Low,
                        ClusterStateMutation::StampForceMergeCompleted {
                            index_name,
                            timestamp_millis,
                        },
                    )
                    .await
                    .map_err(|error| error.to_string())
            })
            .await
    }

    /// Replace `source_index` with `downsample_index` in `stream_name`'s backing indices (§4.6).
    pub async fn swap_downsample_into_stream(
        &self,
        context: &Context,
        stream_name: &str,
        source_index: &str,
        downsample_index: &str,
    ) -> Outcome {
        let key = ClusterTaskKey::SwapDownsampleIntoStream {
            stream_name: stream_name.to_string(),
            downsample_index: downsample_index.to_string(),
        };
        let queue = self.queue.clone();
        let context = context.clone();
        let stream_name = stream_name.to_string();
        let source_index = source_index.to_string();
        let downsample_index = downsample_index.to_string();
        self.dedup
            .execute_once(key, || async move {
                queue
                    .submit(
                        &context,
                        Priority::Normal,
                        ClusterStateMutation::SwapDownsampleIntoStream {
                            stream_name,
                            source_index,
                            downsample_index,
                        },
                    )
                    .await
                    .map_err(|error| error.to_string())
            })
            .await
    }
}
