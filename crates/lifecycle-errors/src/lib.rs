//! Common errors shared across the data stream lifecycle controller crates.

/// The deterministic downsample-index name is already taken by an index that is not itself a
/// downsample product of the expected source.
///
/// This is a terminal condition for the affected index: the name is a pure function of the
/// source name and round interval, so retrying will only reproduce the same clash. Operator
/// action (renaming or removing the clashing index) is required.
#[derive(Debug, thiserror::Error)]
#[error("downsample index '{downsample_index}' for source '{source_index}' already exists and is not a downsample of it")]
pub struct NameClash {
    pub source_index: String,
    pub downsample_index: String,
}

impl NameClash {
    pub fn new<S1: Into<String>, S2: Into<String>>(source_index: S1, downsample_index: S2) -> Self {
        Self {
            source_index: source_index.into(),
            downsample_index: downsample_index.into(),
        }
    }
}

/// The cluster metadata store has not yet recovered its state after a restart.
///
/// While this block is present the controller must ignore cluster-change notifications rather
/// than act on a possibly incomplete view of the cluster.
#[derive(Debug, thiserror::Error)]
#[error("cluster state has not recovered yet, lifecycle run skipped")]
pub struct ClusterStateNotRecovered;
