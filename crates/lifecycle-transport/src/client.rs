//! Idempotence-aware, deduplicated, logging wrappers over [`TransportBackend`] (§4.8).
use std::sync::Arc;

use replicore_lifecycle_context::Context;
use replicore_lifecycle_dedup::RequestDeduplicator;
use replicore_lifecycle_store::ErrorStore;

use crate::backend::TransportBackend;
use crate::error::TransportError;
use crate::requests::AddWriteBlockRequest;
use crate::requests::DeleteIndexRequest;
use crate::requests::DownsampleRequest;
use crate::requests::ForceMergeRequest;
use crate::requests::RolloverRequest;
use crate::requests::TransportKey;
use crate::requests::UpdateSettingsRequest;

type Outcome = Result<(), TransportError>;

/// Deduplicated, idempotence-aware client over the six transport actions.
///
/// Every method funnels through the same [`RequestDeduplicator`], so two callers issuing the
/// "same" request (by [`TransportKey`]) while one is in flight collapse to a single call and both
/// observe its result (§8 properties 4 and 6).
#[derive(Clone)]
pub struct TransportClient {
    backend: Arc<dyn TransportBackend>,
    dedup: Arc<RequestDeduplicator<TransportKey, Outcome>>,
    errors: Arc<ErrorStore>,
}

impl TransportClient {
    pub fn new(backend: impl TransportBackend + 'static, errors: Arc<ErrorStore>) -> Self {
        Self {
            backend: Arc::new(backend),
            dedup: Arc::new(RequestDeduplicator::new()),
            errors,
        }
    }

    /// Drop all in-flight transport requests (mastership loss, §5).
    pub async fn clear_inflight(&self) {
        self.dedup.clear().await;
    }

    pub async fn inflight_count(&self) -> usize {
        self.dedup.len().await
    }

    pub async fn rollover(&self, context: &Context, request: RolloverRequest) -> Outcome {
        let key = request.key();
        let backend = self.backend.clone();
        let context = context.clone();
        self.dedup
            .execute_once(key, || async move {
                let result = backend.rollover(&context, &request).await;
                log_and_absorb(&context, &self.errors, &request.data_stream, "rollover", result.map(|_| ()))
            })
            .await
    }

    pub async fn delete_index(&self, context: &Context, request: DeleteIndexRequest) -> Outcome {
        let key = request.key();
        let backend = self.backend.clone();
        let context = context.clone();
        self.dedup
            .execute_once(key, || async move {
                let result = backend.delete_index(&context, &request).await;
                match result {
                    // SnapshotInProgress is logged but still surfaced so the next run retries.
                    Err(TransportError::SnapshotInProgress(index)) => {
                        slog::info!(
                            context.logger, "Delete deferred, snapshot in progress";
                            "index" => &index,
                        );
                        Err(TransportError::SnapshotInProgress(index))
                    }
                    other => log_and_absorb(
                        &context,
                        &self.errors,
                        &request.index_name,
                        "delete_index",
                        other.map(|_| ()),
                    ),
                }
            })
            .await
    }

    pub async fn add_write_block(&self, context: &Context, request: AddWriteBlockRequest) -> Outcome {
        let key = request.key();
        let backend = self.backend.clone();
        let context = context.clone();
        self.dedup
            .execute_once(key, || async move {
                let result = backend.add_write_block(&context, &request).await;
                let result = match result {
                    Ok(response) if response.acknowledged => Ok(()),
                    Ok(response) if !response.shard_failures.is_empty() => {
                        Err(TransportError::ShardFailure {
                            count: response.shard_failures.len() as u32,
                            detail: response.shard_failures.join("; "),
                        })
                    }
                    Ok(_) => Err(TransportError::NotAcknowledged),
                    Err(error) => Err(error),
                };
                log_and_absorb(&context, &self.errors, &request.index_name, "add_write_block", result)
            })
            .await
    }

    pub async fn update_settings(&self, context: &Context, request: UpdateSettingsRequest) -> Outcome {
        let key = request.key();
        let backend = self.backend.clone();
        let context = context.clone();
        self.dedup
            .execute_once(key, || async move {
                let result = backend.update_settings(&context, &request).await;
                log_and_absorb(
                    &context,
                    &self.errors,
                    &request.index_name,
                    "update_settings",
                    result.map(|_| ()),
                )
            })
            .await
    }

    /// Force-merge, returning the response so the caller can decide whether to submit the
    /// completion-timestamp cluster-state task (§4.5).
    pub async fn force_merge(
        &self,
        context: &Context,
        request: ForceMergeRequest,
    ) -> Outcome {
        let key = request.key();
        let backend = self.backend.clone();
        let context = context.clone();
        self.dedup
            .execute_once(key, || async move {
                let result = backend.force_merge(&context, &request).await;
                let result = result.and_then(|response| {
                    if response.failed_shards > 0 {
                        Err(TransportError::ShardFailure {
                            count: response.failed_shards,
                            detail: format!(
                                "{}/{} shards failed",
                                response.failed_shards, response.total_shards
                            ),
                        })
                    } else if response.successful_shards < response.total_shards {
                        Err(TransportError::NotAcknowledged)
                    } else {
                        Ok(())
                    }
                });
                log_and_absorb(&context, &self.errors, &request.index_name, "force_merge", result)
            })
            .await
    }

    pub async fn downsample(&self, context: &Context, request: DownsampleRequest) -> Outcome {
        let key = request.key();
        let backend = self.backend.clone();
        let context = context.clone();
        self.dedup
            .execute_once(key, || async move {
                let result = backend.downsample(&context, &request).await;
                log_and_absorb(
                    &context,
                    &self.errors,
                    &request.source_index,
                    "downsample",
                    result.map(|_| ()),
                )
            })
            .await
    }
}

/// Apply the two cross-cutting rules shared by every action: log at INFO on success (or clear a
/// stale error store entry if the target turned out to already be gone), and let every other
/// error pass through unchanged for the caller to record.
fn log_and_absorb(
    context: &Context,
    errors: &ErrorStore,
    index_name: &str,
    action: &'static str,
    result: Outcome,
) -> Outcome {
    match result {
        Ok(()) => {
            slog::info!(context.logger, "Transport action succeeded"; "action" => action, "index" => index_name);
            Ok(())
        }
        Err(TransportError::IndexNotFound(index)) => {
            slog::trace!(
                context.logger, "Index not found, treating as already converged";
                "action" => action, "index" => &index,
            );
            errors.clear(&index);
            Ok(())
        }
        Err(error) => Err(error),
    }
}
