//! Request/response shapes for the six transport actions and their deduplication keys.
//!
//! Every request carries a `request_id` used purely for transport-level tracing. Per Design
//! Note 3, that bookkeeping field (and, for [`ForceMergeRequest`], any parent-task/UUID fields a
//! real transport layer would attach) is excluded from the [`TransportKey`] used to deduplicate:
//! two logically identical requests collapse to the same in-flight action regardless of when, or
//! by whom, they were built.
use uuid::Uuid;

use replicore_lifecycle_model::DownsampleConfig;
use replicore_lifecycle_model::RolloverConditions;

/// Deduplication key for transport requests: a pure projection of "what this request does",
/// excluding any per-call bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TransportKey {
    Rollover { data_stream: String },
    Delete { index_name: String },
    AddWriteBlock { index_name: String },
    UpdateSettings { index_name: String },
    ForceMerge { index_name: String },
    Downsample { downsample_index: String },
}

#[derive(Clone, Debug)]
pub struct RolloverRequest {
    pub data_stream: String,
    pub conditions: RolloverConditions,
    pub request_id: Uuid,
}

impl RolloverRequest {
    pub fn new(data_stream: impl Into<String>, conditions: RolloverConditions) -> Self {
        Self {
            data_stream: data_stream.into(),
            conditions,
            request_id: Uuid::new_v4(),
        }
    }

    pub fn key(&self) -> TransportKey {
        TransportKey::Rollover {
            data_stream: self.data_stream.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RolloverResponse {
    pub acknowledged: bool,
}

#[derive(Clone, Debug)]
pub struct DeleteIndexRequest {
    pub index_name: String,
    pub reason: String,
    pub request_id: Uuid,
}

impl DeleteIndexRequest {
    pub fn new(index_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            reason: reason.into(),
            request_id: Uuid::new_v4(),
        }
    }

    pub fn key(&self) -> TransportKey {
        TransportKey::Delete {
            index_name: self.index_name.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DeleteIndexResponse {
    pub acknowledged: bool,
}

#[derive(Clone, Debug)]
pub struct AddWriteBlockRequest {
    pub index_name: String,
    pub request_id: Uuid,
}

impl AddWriteBlockRequest {
    pub fn new(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            request_id: Uuid::new_v4(),
        }
    }

    pub fn key(&self) -> TransportKey {
        TransportKey::AddWriteBlock {
            index_name: self.index_name.clone(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct AddWriteBlockResponse {
    pub acknowledged: bool,
    pub shard_failures: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct UpdateSettingsRequest {
    pub index_name: String,
    pub merge_floor_segment_bytes: u64,
    pub merge_factor: u32,
    pub request_id: Uuid,
}

impl UpdateSettingsRequest {
    pub fn key(&self) -> TransportKey {
        TransportKey::UpdateSettings {
            index_name: self.index_name.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct UpdateSettingsResponse {
    pub acknowledged: bool,
}

/// Force-merge request. Per Design Note 3 the UUID is explicitly excluded from [`TransportKey`]
/// so the same logical merge is deduplicated across callers (§4.5).
#[derive(Clone, Debug)]
pub struct ForceMergeRequest {
    pub index_name: String,
    pub request_id: Uuid,
    pub parent_task: Option<String>,
}

impl ForceMergeRequest {
    pub fn new(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            request_id: Uuid::new_v4(),
            parent_task: None,
        }
    }

    pub fn key(&self) -> TransportKey {
        TransportKey::ForceMerge {
            index_name: self.index_name.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ForceMergeResponse {
    pub total_shards: u32,
    pub successful_shards: u32,
    pub failed_shards: u32,
}

#[derive(Clone, Debug)]
pub struct DownsampleRequest {
    pub source_index: String,
    pub downsample_index: String,
    pub config: DownsampleConfig,
    pub request_id: Uuid,
}

impl DownsampleRequest {
    pub fn new(
        source_index: impl Into<String>,
        downsample_index: impl Into<String>,
        config: DownsampleConfig,
    ) -> Self {
        Self {
            source_index: source_index.into(),
            downsample_index: downsample_index.into(),
            config,
            request_id: Uuid::new_v4(),
        }
    }

    /// Dedup key is the downsample (target) index name alone: repeated runs that reach the same
    /// state produce the same name and must collapse to the same in-flight action (§3 invariant).
    pub fn key(&self) -> TransportKey {
        TransportKey::Downsample {
            downsample_index: self.downsample_index.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DownsampleResponse {
    pub acknowledged: bool,
}
