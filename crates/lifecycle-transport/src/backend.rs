//! The six typed async transport calls the controller issues (§6).
use async_trait::async_trait;

use replicore_lifecycle_context::Context;

use crate::error::TransportError;
use crate::requests::AddWriteBlockRequest;
use crate::requests::AddWriteBlockResponse;
use crate::requests::DeleteIndexRequest;
use crate::requests::DeleteIndexResponse;
use crate::requests::DownsampleRequest;
use crate::requests::DownsampleResponse;
use crate::requests::ForceMergeRequest;
use crate::requests::ForceMergeResponse;
use crate::requests::RolloverRequest;
use crate::requests::RolloverResponse;
use crate::requests::UpdateSettingsRequest;
use crate::requests::UpdateSettingsResponse;

/// Operations implemented by the transport layer to peer nodes in the cluster.
///
/// Individual requests use an effectively-infinite master-node timeout: the operation cost
/// already bounds execution, and a higher-level timeout is deliberately absent (§5).
#[async_trait]
pub trait TransportBackend: Send + Sync {
    async fn rollover(
        &self,
        context: &Context,
        request: &RolloverRequest,
    ) -> Result<RolloverResponse, TransportError>;

    async fn delete_index(
        &self,
        context: &Context,
        request: &DeleteIndexRequest,
    ) -> Result<DeleteIndexResponse, TransportError>;

    async fn add_write_block(
        &self,
        context: &Context,
        request: &AddWriteBlockRequest,
    ) -> Result<AddWriteBlockResponse, TransportError>;

    async fn update_settings(
        &self,
        context: &Context,
        request: &UpdateSettingsRequest,
    ) -> Result<UpdateSettingsResponse, TransportError>;

    async fn force_merge(
        &self,
        context: &Context,
        request: &ForceMergeRequest,
    ) -> Result<ForceMergeResponse, TransportError>;

    async fn downsample(
        &self,
        context: &Context,
        request: &DownsampleRequest,
    ) -> Result<DownsampleResponse, TransportError>;
}
