//! One pass over all lifecycle-managed data streams (§4.4).
use std::collections::HashSet;
use std::sync::Arc;

use time::OffsetDateTime;

use replicore_lifecycle_context::Context;
use replicore_lifecycle_model::ClusterSnapshot;
use replicore_lifecycle_model::DataStream;
use replicore_lifecycle_model::Lifecycle;
use replicore_lifecycle_transport::RolloverRequest;

use crate::cluster_tasks::ClusterTaskClient;
use crate::phase::run_phase;
use crate::settings::Settings;
use crate::ErrorStore;
use crate::TransportClient;
use crate::{downsample, forcemerge};

/// One pass over every lifecycle-managed data stream in a [`ClusterSnapshot`] (§4.4).
///
/// A `LifecycleRun` is stateless between ticks: all of its mutable state (in-flight requests,
/// recorded errors) lives in the shared [`TransportClient`], [`ClusterTaskClient`] and
/// [`ErrorStore`] it is built from, so constructing a fresh run per tick is cheap and correct.
pub struct LifecycleRun {
    transport: TransportClient,
    cluster_tasks: ClusterTaskClient,
    errors: Arc<ErrorStore>,
}

impl LifecycleRun {
    pub fn new(transport: TransportClient, cluster_tasks: ClusterTaskClient, errors: Arc<ErrorStore>) -> Self {
        Self { transport, cluster_tasks, errors }
    }

    /// Run one pass over `snapshot`, taking `now` as the instant used for age calculations and
    /// completion timestamps (passed explicitly rather than read from the clock so that a single
    /// run observes one consistent notion of "now", matching Design Note 2's single-snapshot
    /// discipline).
    pub async fn run(&self, context: &Context, snapshot: &ClusterSnapshot, settings: &Settings, now: OffsetDateTime) {
        self.clear_stale_errors(snapshot);
        for stream in &snapshot.data_streams {
            let Some(lifecycle) = stream.lifecycle.as_ref() else {
                continue;
            };
            self.run_stream(context, snapshot, settings, stream, lifecycle, now).await;
        }
    }

    async fn run_stream(
        &self,
        context: &Context,
        snapshot: &ClusterSnapshot,
        settings: &Settings,
        stream: &DataStream,
        lifecycle: &Lifecycle,
        now: OffsetDateTime,
    ) {
        // Step 2: remember the write index before attempting rollover, for failure attribution.
        let write_index = stream.write_index().map(String::from);
        let mut exclusion: HashSet<String> = HashSet::new();
        if let Some(write_index) = &write_index {
            exclusion.insert(write_index.clone());
        }

        run_phase(context, &stream.name, "rollover", || {
            self.rollover_phase(context, snapshot, stream, write_index.as_deref())
        })
        .await;

        let mut indices_being_removed = HashSet::new();
        run_phase(context, &stream.name, "retention", || async {
            indices_being_removed = self
                .retention_phase(context, snapshot, stream, lifecycle, write_index.as_deref(), now)
                .await?;
            Ok(())
        })
        .await;
        exclusion.extend(indices_being_removed);

        let mut force_merge_affected = HashSet::new();
        run_phase(context, &stream.name, "force_merge", || async {
            force_merge_affected = self
                .force_merge_phase(context, snapshot, stream, lifecycle, settings, &exclusion, now)
                .await?;
            Ok(())
        })
        .await;
        exclusion.extend(force_merge_affected);

        run_phase(context, &stream.name, "downsampling", || {
            self.downsampling_phase(context, snapshot, stream, lifecycle, &exclusion, now)
        })
        .await;
    }

    /// Step 1: drop every error-store entry for an index that no longer exists, or is no longer
    /// lifecycle-managed by any data stream (§4.4 step 1) — including an index that has been
    /// deleted outright and therefore no longer appears in any stream's `backing_indices`, or one
    /// whose stream had its lifecycle switched to unmanaged. Scans the whole error store rather
    /// than a single stream's indices, since a stale entry is not scoped to any one stream.
    fn clear_stale_errors(&self, snapshot: &ClusterSnapshot) {
        let recorded = self.errors.list();
        for index_name in recorded.keys() {
            let still_managed = snapshot.indices.contains_key(index_name)
                && snapshot.data_streams.iter().any(|stream| {
                    stream.backing_indices.iter().any(|backing| backing == index_name)
                        && snapshot.is_lifecycle_managed(&stream.name, index_name)
                });
            if !still_managed {
                self.errors.clear(index_name);
            }
        }
    }

    /// Step 3: roll the write index over if it is still lifecycle-managed.
    async fn rollover_phase(
        &self,
        context: &Context,
        snapshot: &ClusterSnapshot,
        stream: &DataStream,
        write_index: Option<&str>,
    ) -> anyhow::Result<()> {
        let Some(write_index) = write_index else {
            return Ok(());
        };
        if !snapshot.is_lifecycle_managed(&stream.name, write_index) {
            return Ok(());
        }

        let request = RolloverRequest::new(stream.name.clone(), stream.rollover_conditions.clone());
        if let Err(error) = self.transport.rollover(context, request).await {
            // Attribute the failure to the captured write-index name only while the snapshot
            // this run is working from still agrees it is the write index (§4.4 step 3); since
            // a run only ever consults one snapshot, this check is the documented safeguard
            // against a future snapshot-refresh making this read stale.
            if snapshot.data_stream(&stream.name).and_then(DataStream::write_index) == Some(write_index) {
                let message = error.to_string();
                let previous = self.errors.record(write_index, message.clone());
                if previous.as_deref() == Some(message.as_str()) {
                    slog::trace!(context.logger, "Rollover error unchanged"; "index" => write_index, "error" => %error);
                } else {
                    slog::error!(context.logger, "Rollover failed"; "index" => write_index, "error" => %error);
                }
            }
        }
        Ok(())
    }

    /// Step 4: delete backing indices older than the configured retention.
    async fn retention_phase(
        &self,
        context: &Context,
        snapshot: &ClusterSnapshot,
        stream: &DataStream,
        lifecycle: &Lifecycle,
        write_index: Option<&str>,
        now: OffsetDateTime,
    ) -> anyhow::Result<HashSet<String>> {
        let mut removed = HashSet::new();
        let Some(retention) = lifecycle.retention else {
            return Ok(removed);
        };

        for index_name in &stream.backing_indices {
            // The write index is never retention-deleted (§3 invariant), regardless of age.
            if Some(index_name.as_str()) == write_index {
                continue;
            }
            if !lifecycle.is_managed(index_name) {
                continue;
            }
            let Some(meta) = snapshot.index(index_name) else {
                continue;
            };
            if meta.age(now) < retention {
                continue;
            }

            let request = replicore_lifecycle_transport::DeleteIndexRequest::new(index_name, "retention");
            if let Err(error) = self.transport.delete_index(context, request).await {
                let message = error.to_string();
                let previous = self.errors.record(index_name, message.clone());
                if previous.as_deref() != Some(message.as_str()) {
                    slog::error!(context.logger, "Retention delete failed"; "index" => index_name, "error" => %error);
                }
            }
            removed.insert(index_name.clone());
        }
        Ok(removed)
    }

    /// Steps 5-6: force-merge every managed, not-yet-excluded index.
    async fn force_merge_phase(
        &self,
        context: &Context,
        snapshot: &ClusterSnapshot,
        stream: &DataStream,
        lifecycle: &Lifecycle,
        settings: &Settings,
        exclusion: &HashSet<String>,
        now: OffsetDateTime,
    ) -> anyhow::Result<HashSet<String>> {
        let mut affected = HashSet::new();
        for index_name in &stream.backing_indices {
            if exclusion.contains(index_name) || !lifecycle.is_managed(index_name) {
                continue;
            }
            let acted = forcemerge::advance(
                context,
                &self.transport,
                &self.cluster_tasks,
                &self.errors,
                snapshot,
                &settings.merge_target,
                index_name,
                now,
            )
            .await;
            if acted {
                affected.insert(index_name.clone());
            }
        }
        Ok(affected)
    }

    /// Step 7: advance the downsampling state machine for every remaining managed index.
    async fn downsampling_phase(
        &self,
        context: &Context,
        snapshot: &ClusterSnapshot,
        stream: &DataStream,
        lifecycle: &Lifecycle,
        exclusion: &HashSet<String>,
        now: OffsetDateTime,
    ) -> anyhow::Result<()> {
        for index_name in &stream.backing_indices {
            if exclusion.contains(index_name) || !lifecycle.is_managed(index_name) {
                continue;
            }
            downsample::advance(
                context,
                &self.transport,
                &self.cluster_tasks,
                &self.errors,
                snapshot,
                stream,
                lifecycle,
                index_name,
                now,
            )
            .await;
        }
        Ok(())
    }
}
