//! Data model shared by every lifecycle controller crate.
//!
//! Nothing in this crate performs I/O: it is the pure, serialisable shape of what a
//! [`ClusterSnapshot`] looks like at the moment a `LifecycleRun` observes it. The snapshot is
//! supplied by the (out of scope) cluster metadata store; this crate only describes its shape.
use std::collections::HashMap;
use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

/// Custom-metadata key under which the controller reads/writes its own per-index bookkeeping.
pub const LIFECYCLE_METADATA_KEY: &str = "data_streams.lifecycle";

/// Custom-metadata field holding the wall-clock millisecond timestamp of a completed force-merge.
pub const FORCE_MERGE_COMPLETED_TIMESTAMP: &str = "force_merge_completed_timestamp";

/// Progress of a downsample index produced from a source index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DownsampleStatus {
    #[default]
    Unknown,
    Started,
    Success,
}

/// One step of a data stream's downsampling schedule.
///
/// Rounds are matched once an index's age is at least `after`; callers are expected to keep a
/// data stream's rounds sorted ascending by `after` (the controller does not reorder them, it
/// only relies on the order being correct, per the source system's own invariant).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownsamplingRound {
    pub after: Duration,
    pub config: DownsampleConfig,
}

/// Downsample target configuration for a round.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownsampleConfig {
    pub fixed_interval: String,
}

/// Lifecycle policy attached to a data stream.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Lifecycle {
    /// Maximum age a backing index may reach before it is deleted.
    pub retention: Option<Duration>,

    /// Ordered downsampling rounds, ascending by `after`.
    pub downsampling: Vec<DownsamplingRound>,

    /// Backing indices excluded from lifecycle management despite belonging to the stream.
    pub unmanaged_indices: HashSet<String>,
}

impl Lifecycle {
    /// Whether the named backing index is managed by this lifecycle.
    pub fn is_managed(&self, index_name: &str) -> bool {
        !self.unmanaged_indices.contains(index_name)
    }

    /// Downsampling rounds whose `after` duration has already elapsed for `age`, in order.
    pub fn matching_rounds(&self, age: Duration) -> Vec<&DownsamplingRound> {
        self.downsampling.iter().filter(|round| age >= round.after).collect()
    }
}

/// Conditions under which a write index is rolled over into a new one.
///
/// Inherited from cluster defaults (§6) unless the data stream overrides them; this controller
/// only ever reads this composite, it never edits it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RolloverConditions {
    pub max_age: Option<Duration>,
    pub max_docs: Option<u64>,
    pub max_primary_shard_size_bytes: Option<u64>,
}

/// Per-index settings relevant to lifecycle decisions.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IndexSettings {
    /// Configured merge-policy floor-segment size, in bytes.
    pub merge_floor_segment_bytes: u64,

    /// Configured merge-policy merge factor.
    pub merge_factor: u32,

    /// Name of the index this one was downsampled from, if it is a downsample product.
    pub downsample_source_name: Option<String>,

    /// Progress of this index's own downsample job, if it is a downsample product in progress.
    pub downsample_status: DownsampleStatus,
}

/// Metadata the controller needs about one backing index.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexMeta {
    pub name: String,
    pub creation_time: OffsetDateTime,
    pub settings: IndexSettings,
    pub write_block: bool,

    /// Custom metadata keyed by namespace (e.g. [`LIFECYCLE_METADATA_KEY`]), each a flat
    /// string-to-string map. The controller only ever writes the single
    /// [`FORCE_MERGE_COMPLETED_TIMESTAMP`] field under its own namespace, preserving any other
    /// keys already present.
    pub custom_metadata: HashMap<String, HashMap<String, String>>,
}

impl IndexMeta {
    /// Age of the index relative to `now`.
    pub fn age(&self, now: OffsetDateTime) -> Duration {
        let delta = now - self.creation_time;
        delta.try_into().unwrap_or(Duration::ZERO)
    }

    /// The stamped force-merge completion timestamp, if any.
    pub fn force_merge_completed_timestamp(&self) -> Option<&str> {
        self.custom_metadata
            .get(LIFECYCLE_METADATA_KEY)?
            .get(FORCE_MERGE_COMPLETED_TIMESTAMP)
            .map(String::as_str)
    }

    /// Whether this index is itself a downsample product of another index.
    pub fn is_downsample_product(&self) -> bool {
        self.settings.downsample_source_name.is_some()
    }
}

/// A named, ordered collection of backing indices with one write index.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataStream {
    pub name: String,

    /// Ordered backing indices; the last entry is the write index.
    pub backing_indices: Vec<String>,

    pub lifecycle: Option<Lifecycle>,
    pub rollover_conditions: RolloverConditions,
}

impl DataStream {
    /// The distinguished write index, if the stream has any backing indices.
    pub fn write_index(&self) -> Option<&str> {
        self.backing_indices.last().map(String::as_str)
    }

    /// Whether `index_name` is this stream's current write index.
    pub fn is_write_index(&self, index_name: &str) -> bool {
        self.write_index() == Some(index_name)
    }
}

/// Immutable view of all data streams and index metadata at a point in time.
///
/// Every [`LifecycleRun`](https://docs.rs/replicore-lifecycle-run) receives exactly one snapshot;
/// all decisions within that run are made against it (Design Note 2: prefer one snapshot per
/// decision point over mixing reads of different ages).
#[derive(Clone, Debug, Default)]
pub struct ClusterSnapshot {
    pub data_streams: Vec<DataStream>,
    pub indices: HashMap<String, IndexMeta>,
}

impl ClusterSnapshot {
    pub fn index(&self, name: &str) -> Option<&IndexMeta> {
        self.indices.get(name)
    }

    pub fn data_stream(&self, name: &str) -> Option<&DataStream> {
        self.data_streams.iter().find(|stream| stream.name == name)
    }

    /// Whether an index still exists and is still lifecycle-managed in this snapshot.
    pub fn is_lifecycle_managed(&self, stream_name: &str, index_name: &str) -> bool {
        let stream = match self.data_stream(stream_name) {
            Some(stream) => stream,
            None => return false,
        };
        if !self.indices.contains_key(index_name) {
            return false;
        }
        match &stream.lifecycle {
            Some(lifecycle) => lifecycle.is_managed(index_name),
            None => false,
        }
    }
}

/// Deterministic downsample-index name, a pure function of `(source, fixed_interval)`.
///
/// Must match bit-for-bit across versions/processes so repeated runs reaching the same state
/// produce the same name, and therefore the same deduplication key (Design Note: "Deterministic
/// name generation").
pub fn downsample_index_name(source_name: &str, fixed_interval: &str) -> String {
    format!("downsample-{source_name}-{fixed_interval}")
}
