//! Stand-in implementations of the out-of-scope collaborators (§1): the cluster metadata store,
//! the peer-node transport, and the cluster-state task executor. A real deployment wires in the
//! actual implementations of these capabilities; until then the process stays inert rather than
//! acting on fabricated state, mirroring the teacher's `EventsNull` placeholder pattern.
use async_trait::async_trait;

use replicore_lifecycle_context::Context;
use replicore_lifecycle_errors::ClusterStateNotRecovered;
use replicore_lifecycle_master::ClusterMetadataService;
use replicore_lifecycle_model::ClusterSnapshot;
use replicore_lifecycle_tasks::ClusterStateMutation;
use replicore_lifecycle_tasks::ClusterStateTaskQueueBackend;
use replicore_lifecycle_tasks::Priority;
use replicore_lifecycle_transport::AddWriteBlockRequest;
use replicore_lifecycle_transport::AddWriteBlockResponse;
use replicore_lifecycle_transport::DeleteIndexRequest;
use replicore_lifecycle_transport::DeleteIndexResponse;
use replicore_lifecycle_transport::DownsampleRequest;
use replicore_lifecycle_transport::DownsampleResponse;
use replicore_lifecycle_transport::ForceMergeRequest;
use replicore_lifecycle_transport::ForceMergeResponse;
use replicore_lifecycle_transport::RolloverRequest;
use replicore_lifecycle_transport::RolloverResponse;
use replicore_lifecycle_transport::TransportBackend;
use replicore_lifecycle_transport::TransportError;
use replicore_lifecycle_transport::UpdateSettingsRequest;
use replicore_lifecycle_transport::UpdateSettingsResponse;

/// Cluster metadata service that never recovers.
///
/// Since the scheduler's job re-checks mastership and cluster recovery on every tick (§4.3)
/// before touching the transport or task queue, wiring this placeholder in as the cluster
/// collaborator keeps the process running without ever issuing a transport call against
/// collaborators that are not actually present.
pub struct ClusterMetadataNull;

#[async_trait]
impl ClusterMetadataService for ClusterMetadataNull {
    async fn state(&self) -> Result<ClusterSnapshot, ClusterStateNotRecovered> {
        Err(ClusterStateNotRecovered)
    }
}

/// Transport backend that refuses every call.
///
/// Never reached while [`ClusterMetadataNull`] is in use; present so the process can be wired up
/// end to end ahead of a real transport implementation being plugged in.
pub struct TransportNull;

#[async_trait]
impl TransportBackend for TransportNull {
    async fn rollover(
        &self,
        _context: &Context,
        _request: &RolloverRequest,
    ) -> Result<RolloverResponse, TransportError> {
        Err(TransportError::Other("no transport backend configured".into()))
    }

    async fn delete_index(
        &self,
        _context: &Context,
        _request: &DeleteIndexRequest,
    ) -> Result<DeleteIndexResponse, TransportError> {
        Err(TransportError::Other("no transport backend configured".into()))
    }

    async fn add_write_block(
        &self,
        _context: &Context,
        _request: &AddWriteBlockRequest,
    ) -> Result<AddWriteBlockResponse, TransportError> {
        Err(TransportError::Other("no transport backend configured".into()))
    }

    async fn update_settings(
        &self,
        _context: &Context,
        _request: &UpdateSettingsRequest,
    ) -> Result<UpdateSettingsResponse, TransportError> {
        Err(TransportError::Other("no transport backend configured".into()))
    }

    async fn force_merge(
        &self,
        _context: &Context,
        _request: &ForceMergeRequest,
    ) -> Result<ForceMergeResponse, TransportError> {
        Err(TransportError::Other("no transport backend configured".into()))
    }

    async fn downsample(
        &self,
        _context: &Context,
        _request: &DownsampleRequest,
    ) -> Result<DownsampleResponse, TransportError> {
        Err(TransportError::Other("no transport backend configured".into()))
    }
}

/// Cluster-state task queue that refuses every submission. Never reached while
/// [`ClusterMetadataNull`] is in use.
pub struct ClusterTasksNull;

#[async_trait]
impl ClusterStateTaskQueueBackend for ClusterTasksNull {
    async fn submit(
        &self,
        _context: &Context,
        _priority: Priority,
        _mutation: ClusterStateMutation,
    ) -> anyhow::Result<()> {
        anyhow::bail!("no cluster-state task queue backend configured")
    }
}
