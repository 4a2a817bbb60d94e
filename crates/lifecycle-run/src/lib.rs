//! The heart of the controller: one pass over all lifecycle-managed data streams per tick (§4.4).
mod cluster_tasks;
mod downsample;
mod forcemerge;
mod phase;
mod run;
pub mod settings;

pub use crate::cluster_tasks::ClusterTaskClient;
pub use crate::cluster_tasks::ClusterTaskKey;
pub use crate::run::LifecycleRun;
pub use crate::settings::Settings;
pub use replicore_lifecycle_store::ErrorStore;
pub use replicore_lifecycle_transport::TransportClient;

/// Name the scheduler registers this job under (§6).
pub const JOB_NAME: &str = "data_stream_lifecycle";

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    use time::OffsetDateTime;

    use replicore_lifecycle_context::Context;
    use replicore_lifecycle_model::ClusterSnapshot;
    use replicore_lifecycle_model::DataStream;
    use replicore_lifecycle_model::IndexMeta;
    use replicore_lifecycle_model::IndexSettings;
    use replicore_lifecycle_model::Lifecycle;
    use replicore_lifecycle_model::RolloverConditions;
    use replicore_lifecycle_tasks::ClusterStateTaskQueueFixture;
    use replicore_lifecycle_transport::TransportCall;
    use replicore_lifecycle_transport::TransportFixture;

    use super::cluster_tasks::ClusterTaskClient;
    use super::run::LifecycleRun;
    use super::settings::Settings;
    use super::ErrorStore;
    use super::TransportClient;

    /// Fixed reference instant far enough past the epoch that every age used below, subtracted
    /// from it, still yields a valid `creation_time`.
    fn now() -> OffsetDateTime {
        OffsetDateTime::UNIX_EPOCH + Duration::from_secs(365 * 86400)
    }

    fn meta_at_age(name: &str, age: Duration) -> IndexMeta {
        IndexMeta {
            name: name.to_string(),
            creation_time: now() - age,
            settings: IndexSettings::default(),
            write_block: false,
            custom_metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn s1_rollover_on_age() {
        let mut fixture = TransportFixture::new();
        let errors = Arc::new(ErrorStore::new());
        let transport = TransportClient::new(fixture.backend(), errors.clone());
        let tasks_fixture = ClusterStateTaskQueueFixture::new();
        let cluster_tasks = ClusterTaskClient::new(tasks_fixture.backend());
        let run = LifecycleRun::new(transport, cluster_tasks, errors.clone());
        let context = Context::fixture();

        let lifecycle = Lifecycle {
            retention: Some(Duration::from_secs(30 * 86400)),
            downsampling: Vec::new(),
            unmanaged_indices: HashSet::new(),
        };
        let stream = DataStream {
            name: "logs".to_string(),
            backing_indices: vec!["logs-000001".to_string()],
            lifecycle: Some(lifecycle),
            rollover_conditions: RolloverConditions {
                max_age: Some(Duration::from_secs(7 * 86400)),
                max_docs: None,
                max_primary_shard_size_bytes: None,
            },
        };
        let age = Duration::from_secs(7 * 86400 + 1);
        let mut indices = HashMap::new();
        indices.insert("logs-000001".to_string(), meta_at_age("logs-000001", age));
        let snapshot = ClusterSnapshot { data_streams: vec![stream], indices };

        run.run(&context, &snapshot, &Settings::default(), now()).await;

        let mut calls = Vec::new();
        while let Some(call) = fixture.pop_call_timeout(Duration::from_millis(50)).await {
            calls.push(call);
        }
        assert_eq!(calls.len(), 1);
        assert!(matches!(calls[0], TransportCall::Rollover(_)));
        assert!(errors.list().is_empty());
    }

    #[tokio::test]
    async fn s2_retention_deletes_oldest_and_excludes_both_from_force_merge() {
        let mut fixture = TransportFixture::new();
        let errors = Arc::new(ErrorStore::new());
        let transport = TransportClient::new(fixture.backend(), errors.clone());
        let tasks_fixture = ClusterStateTaskQueueFixture::new();
        let cluster_tasks = ClusterTaskClient::new(tasks_fixture.backend());
        let run = LifecycleRun::new(transport, cluster_tasks, errors.clone());
        let context = Context::fixture();

        let lifecycle = Lifecycle {
            retention: Some(Duration::from_secs(30 * 86400)),
            downsampling: Vec::new(),
            unmanaged_indices: HashSet::new(),
        };
        let stream = DataStream {
            name: "logs".to_string(),
            backing_indices: vec!["logs-000001".to_string(), "logs-000002".to_string()],
            lifecycle: Some(lifecycle),
            rollover_conditions: RolloverConditions::default(),
        };
        let mut indices = HashMap::new();
        indices.insert(
            "logs-000001".to_string(),
            meta_at_age("logs-000001", Duration::from_secs(31 * 86400)),
        );
        indices.insert(
            "logs-000002".to_string(),
            meta_at_age("logs-000002", Duration::from_secs(1)),
        );
        let snapshot = ClusterSnapshot { data_streams: vec![stream], indices };

        run.run(&context, &snapshot, &Settings::default(), now()).await;

        let mut saw_delete = false;
        while let Some(call) = fixture.pop_call_timeout(Duration::from_millis(50)).await {
            match call {
                TransportCall::DeleteIndex(request) => {
                    assert_eq!(request.index_name, "logs-000001");
                    saw_delete = true;
                }
                TransportCall::ForceMerge(request) => {
                    // The write index is never force-merged, never the retention target.
                    assert_ne!(request.index_name, "logs-000002");
                    assert_ne!(request.index_name, "logs-000001");
                }
                _ => {}
            }
        }
        assert!(saw_delete);
    }

    #[tokio::test]
    async fn downsampling_is_skipped_for_streams_without_lifecycle() {
        let fixture = TransportFixture::new();
        let errors = Arc::new(ErrorStore::new());
        let transport = TransportClient::new(fixture.backend(), errors.clone());
        let tasks_fixture = ClusterStateTaskQueueFixture::new();
        let cluster_tasks = ClusterTaskClient::new(tasks_fixture.backend());
        let run = LifecycleRun::new(transport, cluster_tasks, errors.clone());
        let context = Context::fixture();

        let stream = DataStream {
            name: "unmanaged".to_string(),
            backing_indices: vec!["unmanaged-000001".to_string()],
            lifecycle: None,
            rollover_conditions: RolloverConditions::default(),
        };
        let snapshot = ClusterSnapshot { data_streams: vec![stream], indices: HashMap::new() };

        run.run(&context, &snapshot, &Settings::default(), OffsetDateTime::UNIX_EPOCH).await;
        assert!(errors.list().is_empty());
    }

    #[tokio::test]
    async fn stale_errors_are_cleared_for_deleted_and_unmanaged_indices() {
        let fixture = TransportFixture::new();
        let errors = Arc::new(ErrorStore::new());
        let transport = TransportClient::new(fixture.backend(), errors.clone());
        let tasks_fixture = ClusterStateTaskQueueFixture::new();
        let cluster_tasks = ClusterTaskClient::new(tasks_fixture.backend());
        let run = LifecycleRun::new(transport, cluster_tasks, errors.clone());
        let context = Context::fixture();

        // "logs-000001" was deleted outright: it is absent from the snapshot entirely, including
        // every stream's `backing_indices` — the case a per-stream scan can never observe.
        errors.record("logs-000001", "index not found");
        // "metrics-000001" still exists, but its stream's lifecycle was switched to unmanaged —
        // `run()` skips such streams entirely, so this can only be cleared by a store-wide scan.
        errors.record("metrics-000001", "rollover failed");

        let stream = DataStream {
            name: "metrics".to_string(),
            backing_indices: vec!["metrics-000001".to_string()],
            lifecycle: None,
            rollover_conditions: RolloverConditions::default(),
        };
        let mut indices = HashMap::new();
        indices.insert(
            "metrics-000001".to_string(),
            meta_at_age("metrics-000001", Duration::from_secs(1)),
        );
        let snapshot = ClusterSnapshot { data_streams: vec![stream], indices };

        run.run(&context, &snapshot, &Settings::default(), now()).await;

        assert!(errors.get("logs-000001").is_none());
        assert!(errors.get("metrics-000001").is_none());
    }
}
