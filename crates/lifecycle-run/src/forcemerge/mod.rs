//! Force-merge subsystem: settings gate, force-merge, completion stamp (§4.5).
use time::OffsetDateTime;

use replicore_lifecycle_context::Context;
use replicore_lifecycle_model::ClusterSnapshot;
use replicore_lifecycle_transport::ForceMergeRequest;
use replicore_lifecycle_transport::UpdateSettingsRequest;

use crate::cluster_tasks::ClusterTaskClient;
use crate::settings::MergePolicyTarget;
use crate::ErrorStore;
use crate::TransportClient;

/// Advance one index's force-merge state by exactly one step (§4.5).
///
/// Returns whether the index was acted upon this run (settings-updated or force-merge-issued);
/// the caller folds a `true` result into the run's exclusion set, since an acted-upon index must
/// not also be handed to the downsampling phase in the same pass (§4.4 step 6).
pub async fn advance(
    context: &Context,
    transport: &TransportClient,
    cluster_tasks: &ClusterTaskClient,
    errors: &ErrorStore,
    snapshot: &ClusterSnapshot,
    target: &MergePolicyTarget,
    index_name: &str,
    now: OffsetDateTime,
) -> bool {
    let meta = match snapshot.index(index_name) {
        Some(meta) => meta,
        None => return false,
    };

    if meta.force_merge_completed_timestamp().is_some() {
        return false;
    }

    if !target.matches(meta.settings.merge_factor, meta.settings.merge_floor_segment_bytes) {
        let request = UpdateSettingsRequest {
            index_name: index_name.to_string(),
            merge_floor_segment_bytes: target.floor_segment_bytes,
            merge_factor: target.merge_factor,
            request_id: uuid::Uuid::new_v4(),
        };
        if let Err(error) = transport.update_settings(context, request).await {
            record_error(errors, context, index_name, &error.to_string());
        }
        // Settings updated (or attempted): wait for next run to observe them before merging.
        return true;
    }

    let request = ForceMergeRequest::new(index_name);
    match transport.force_merge(context, request).await {
        Ok(()) => {
            let timestamp_millis = (now.unix_timestamp_nanos() / 1_000_000) as i64;
            if let Err(error) = cluster_tasks
                .stamp_force_merge_completed(context, index_name, timestamp_millis)
                .await
            {
                slog::error!(
                    context.logger, "Failed to submit force-merge completion stamp";
                    "index" => index_name, "error" => %error,
                );
            }
        }
        Err(error) => record_error(errors, context, index_name, &error.to_string()),
    }
    true
}

fn record_error(errors: &ErrorStore, context: &Context, index_name: &str, message: &str) {
    let previous = errors.record(index_name, message);
    if previous.as_deref() == Some(message) {
        slog::trace!(context.logger, "Force-merge subsystem error unchanged"; "index" => index_name, "error" => message);
    } else {
        slog::error!(context.logger, "Force-merge subsystem error"; "index" => index_name, "error" => message);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use time::OffsetDateTime;

    use replicore_lifecycle_context::Context;
    use replicore_lifecycle_model::ClusterSnapshot;
    use replicore_lifecycle_model::IndexMeta;
    use replicore_lifecycle_model::IndexSettings;
    use replicore_lifecycle_model::FORCE_MERGE_COMPLETED_TIMESTAMP;
    use replicore_lifecycle_model::LIFECYCLE_METADATA_KEY;
    use replicore_lifecycle_tasks::ClusterStateTaskQueueFixture;
    use replicore_lifecycle_transport::ForceMergeResponse;
    use replicore_lifecycle_transport::TransportFixture;

    use super::advance;
    use crate::cluster_tasks::ClusterTaskClient;
    use crate::settings::MergePolicyTarget;
    use crate::ErrorStore;
    use crate::TransportClient;

    fn snapshot_with(index_name: &str, meta: IndexMeta) -> ClusterSnapshot {
        let mut indices = HashMap::new();
        indices.insert(index_name.to_string(), meta);
        ClusterSnapshot {
            data_streams: Vec::new(),
            indices,
        }
    }

    fn bare_meta(name: &str, settings: IndexSettings) -> IndexMeta {
        IndexMeta {
            name: name.to_string(),
            creation_time: OffsetDateTime::UNIX_EPOCH,
            settings,
            write_block: false,
            custom_metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn mismatched_settings_trigger_update_and_defer_merge() {
        let fixture = TransportFixture::new();
        let errors = ErrorStore::new();
        let transport = TransportClient::new(fixture.backend(), Arc::new(errors));
        let tasks_fixture = ClusterStateTaskQueueFixture::new();
        let cluster_tasks = ClusterTaskClient::new(tasks_fixture.backend());
        let errors = ErrorStore::new();
        let context = Context::fixture();

        let meta = bare_meta(
            "idx-1",
            IndexSettings {
                merge_floor_segment_bytes: 50 * 1024 * 1024,
                merge_factor: 16,
                ..IndexSettings::default()
            },
        );
        let snapshot = snapshot_with("idx-1", meta);
        let target = MergePolicyTarget::default();

        let affected = advance(
            &context,
            &transport,
            &cluster_tasks,
            &errors,
            &snapshot,
            &target,
            "idx-1",
            OffsetDateTime::UNIX_EPOCH,
        )
        .await;
        assert!(affected);
    }

    #[tokio::test]
    async fn matching_settings_trigger_force_merge_and_stamp() {
        let fixture = TransportFixture::new();
        fixture.set_force_merge_response(Ok(ForceMergeResponse {
            total_shards: 3,
            successful_shards: 3,
            failed_shards: 0,
        }));
        let errors = ErrorStore::new();
        let transport = TransportClient::new(fixture.backend(), Arc::new(errors));
        let mut tasks_fixture = ClusterStateTaskQueueFixture::new();
        let cluster_tasks = ClusterTaskClient::new(tasks_fixture.backend());
        let errors = ErrorStore::new();
        let context = Context::fixture();

        let target = MergePolicyTarget::default();
        let meta = bare_meta(
            "idx-1",
            IndexSettings {
                merge_floor_segment_bytes: target.floor_segment_bytes,
                merge_factor: target.merge_factor,
                ..IndexSettings::default()
            },
        );
        let snapshot = snapshot_with("idx-1", meta);

        let affected = advance(
            &context,
            &transport,
            &cluster_tasks,
            &errors,
            &snapshot,
            &target,
            "idx-1",
            OffsetDateTime::UNIX_EPOCH,
        )
        .await;
        assert!(affected);
        let (_, mutation) = tasks_fixture.pop().await;
        match mutation {
            replicore_lifecycle_tasks::ClusterStateMutation::StampForceMergeCompleted {
                index_name,
                ..
            } => assert_eq!(index_name, "idx-1"),
            other => panic!("unexpected mutation: {other:?}"),
        }
    }

    #[tokio::test]
    async fn already_stamped_index_is_skipped() {
        let fixture = TransportFixture::new();
        let errors = ErrorStore::new();
        let transport = TransportClient::new(fixture.backend(), Arc::new(errors));
        let tasks_fixture = ClusterStateTaskQueueFixture::new();
        let cluster_tasks = ClusterTaskClient::new(tasks_fixture.backend());
        let errors = ErrorStore::new();
        let context = Context::fixture();

        let mut lifecycle_ns = HashMap::new();
        lifecycle_ns.insert(FORCE_MERGE_COMPLETED_TIMESTAMP.to_string(), "1000".to_string());
        let mut custom_metadata = HashMap::new();
        custom_metadata.insert(LIFECYCLE_METADATA_KEY.to_string(), lifecycle_ns);
        let mut meta = bare_meta("idx-1", IndexSettings::default());
        meta.custom_metadata = custom_metadata;
        let snapshot = snapshot_with("idx-1", meta);

        let affected = advance(
            &context,
            &transport,
            &cluster_tasks,
            &errors,
            &snapshot,
            &MergePolicyTarget::default(),
            "idx-1",
            OffsetDateTime::UNIX_EPOCH,
        )
        .await;
        assert!(!affected);
    }
}
