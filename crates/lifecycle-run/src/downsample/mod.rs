//! Per-index multi-round downsampling progression (§4.6).
use time::OffsetDateTime;

use replicore_lifecycle_errors::NameClash;
use replicore_lifecycle_model::ClusterSnapshot;
use replicore_lifecycle_model::DataStream;
use replicore_lifecycle_model::DownsampleStatus;
use replicore_lifecycle_model::DownsamplingRound;
use replicore_lifecycle_model::{downsample_index_name, Lifecycle};
use replicore_lifecycle_context::Context;
use replicore_lifecycle_transport::AddWriteBlockRequest;
use replicore_lifecycle_transport::DeleteIndexRequest;
use replicore_lifecycle_transport::DownsampleRequest;

use crate::cluster_tasks::ClusterTaskClient;
use crate::ErrorStore;
use crate::TransportClient;

/// Advance one index's downsampling state by exactly one step.
///
/// Returns whether the index was acted upon this run, for the caller to track as "affected"
/// (mirroring the force-merge subsystem, though by this point in the run the index is no longer a
/// candidate for any other phase — downsampling is last, §4.4 step 7).
pub async fn advance(
    context: &Context,
    transport: &TransportClient,
    cluster_tasks: &ClusterTaskClient,
    errors: &ErrorStore,
    snapshot: &ClusterSnapshot,
    stream: &DataStream,
    lifecycle: &Lifecycle,
    index_name: &str,
    now: OffsetDateTime,
) -> bool {
    let meta = match snapshot.index(index_name) {
        Some(meta) => meta,
        None => return false,
    };

    let rounds = lifecycle.matching_rounds(meta.age(now));
    if rounds.is_empty() {
        return false;
    }

    // Read-only transition: an index must be blocked before any round is allowed to progress.
    if !meta.is_downsample_product() && !meta.write_block {
        let request = AddWriteBlockRequest::new(index_name);
        if let Err(error) = transport.add_write_block(context, request).await {
            record_transient(errors, context, index_name, &error.to_string());
        }
        return true;
    }

    // Source cleanup: a downsample product whose own job already succeeded drops its source.
    if meta.is_downsample_product() {
        if let Some(source_name) = &meta.settings.downsample_source_name {
            if meta.settings.downsample_status == DownsampleStatus::Success
                && snapshot.index(source_name).is_some()
            {
                let request = DeleteIndexRequest::new(
                    source_name,
                    "replacement with its downsampled index in the data stream",
                );
                if let Err(error) = transport.delete_index(context, request).await {
                    record_transient(errors, context, source_name, &error.to_string());
                }
                return true;
            }
        }
    }

    advance_rounds(context, transport, cluster_tasks, errors, snapshot, stream, index_name, &rounds).await
}

async fn advance_rounds(
    context: &Context,
    transport: &TransportClient,
    cluster_tasks: &ClusterTaskClient,
    errors: &ErrorStore,
    snapshot: &ClusterSnapshot,
    stream: &DataStream,
    index_name: &str,
    rounds: &[&DownsamplingRound],
) -> bool {
    let last_round = match rounds.last() {
        Some(round) => *round,
        None => return false,
    };

    for round in rounds {
        let downsample_name = downsample_index_name(index_name, &round.config.fixed_interval);
        let is_last_round = std::ptr::eq(*round, last_round);

        match snapshot.index(&downsample_name) {
            None => {
                if is_last_round {
                    let request =
                        DownsampleRequest::new(index_name, downsample_name, round.config.clone());
                    if let Err(error) = transport.downsample(context, request).await {
                        record_transient(errors, context, index_name, &error.to_string());
                    }
                    return true;
                }
                // Earlier round never started: wait for the last round to trigger it.
                continue;
            }
            Some(target) => match target.settings.downsample_status {
                DownsampleStatus::Unknown => {
                    if is_last_round {
                        let error = NameClash {
                            source_index: index_name.to_string(),
                            downsample_index: downsample_name.clone(),
                        };
                        let message = error.to_string();
                        let previous = errors.record(index_name, message.clone());
                        if previous.as_deref() == Some(message.as_str()) {
                            slog::trace!(context.logger, "Downsample name clash unchanged"; "index" => index_name, "target" => %downsample_name);
                        } else {
                            slog::error!(context.logger, "Downsample target name clash"; "index" => index_name, "target" => %downsample_name);
                        }
                    }
                    continue;
                }
                DownsampleStatus::Started => {
                    // A prior owner (possibly a failed-over master) may have lost the in-flight
                    // task; re-issuing is safe, the transport deduplicator/target name absorb it.
                    let request =
                        DownsampleRequest::new(index_name, downsample_name, round.config.clone());
                    if let Err(error) = transport.downsample(context, request).await {
                        record_transient(errors, context, index_name, &error.to_string());
                    }
                    return true;
                }
                DownsampleStatus::Success => {
                    if !stream.backing_indices.iter().any(|name| name == &downsample_name) {
                        if let Err(error) = cluster_tasks
                            .swap_downsample_into_stream(context, &stream.name, index_name, &downsample_name)
                            .await
                        {
                            slog::error!(
                                context.logger, "Failed to submit downsample swap";
                                "stream" => &stream.name, "index" => index_name, "error" => %error,
                            );
                        }
                        return true;
                    }
                    continue;
                }
            },
        }
    }

    false
}

fn record_transient(errors: &ErrorStore, context: &Context, index_name: &str, message: &str) {
    let previous = errors.record(index_name, message);
    if previous.as_deref() == Some(message) {
        slog::trace!(context.logger, "Downsampling subsystem error unchanged"; "index" => index_name, "error" => message);
    } else {
        slog::error!(context.logger, "Downsampling subsystem error"; "index" => index_name, "error" => message);
    }
}
