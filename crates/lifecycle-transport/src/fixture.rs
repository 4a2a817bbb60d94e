//! In-memory [`TransportBackend`] for unit tests: canned responses plus call introspection.
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::Sender;

use replicore_lifecycle_context::Context;

use crate::backend::TransportBackend;
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

/// One call recorded by [`TransportFixtureBackend`], for assertions on what was sent.
#[derive(Clone, Debug)]
pub enum TransportCall {
    Rollover(RolloverRequest),
    DeleteIndex(DeleteIndexRequest),
    AddWriteBlock(AddWriteBlockRequest),
    UpdateSettings(UpdateSettingsRequest),
    ForceMerge(ForceMergeRequest),
    Downsample(DownsampleRequest),
}

#[derive(Default)]
struct Responses {
    rollover: Option<Result<RolloverResponse, TransportError>>,
    delete_index: Option<Result<DeleteIndexResponse, TransportError>>,
    add_write_block: Option<Result<AddWriteBlockResponse, TransportError>>,
    update_settings: Option<Result<UpdateSettingsResponse, TransportError>>,
    force_merge: Option<Result<ForceMergeResponse, TransportError>>,
    downsample: Option<Result<DownsampleResponse, TransportError>>,
}

/// Introspection handle for a [`TransportFixtureBackend`].
///
/// Mirrors the `TasksFixture`/backend split used for the cluster-state task queue: the fixture
/// owns the receiving end of the call log and the preset responses, the backend is the cheap,
/// cloneable handle actually wired into a [`crate::TransportClient`].
pub struct TransportFixture {
    calls: Receiver<TransportCall>,
    send_call: Sender<TransportCall>,
    responses: Arc<StdMutex<Responses>>,
}

impl TransportFixture {
    pub fn new() -> Self {
        let (send_call, calls) = broadcast::channel(50);
        Self {
            calls,
            send_call,
            responses: Arc::new(StdMutex::new(Responses::default())),
        }
    }

    pub fn backend(&self) -> TransportFixtureBackend {
        TransportFixtureBackend {
            send_call: self.send_call.clone(),
            responses: self.responses.clone(),
        }
    }

    pub async fn pop_call(&mut self) -> TransportCall {
        self.calls.recv().await.expect("transport fixture call channel closed")
    }

    pub async fn pop_call_timeout(&mut self, timeout: Duration) -> Option<TransportCall> {
        tokio::time::timeout(timeout, self.pop_call()).await.ok()
    }

    pub fn set_rollover_response(&self, response: Result<RolloverResponse, TransportError>) {
        self.responses.lock().expect("fixture mutex poisoned").rollover = Some(response);
    }

    pub fn set_delete_index_response(&self, response: Result<DeleteIndexResponse, TransportError>) {
        self.responses.lock().expect("fixture mutex poisoned").delete_index = Some(response);
    }

    pub fn set_add_write_block_response(&self, response: Result<AddWriteBlockResponse, TransportError>) {
        self.responses.lock().expect("fixture mutex poisoned").add_write_block = Some(response);
    }

    pub fn set_update_settings_response(&self, response: Result<UpdateSettingsResponse, TransportError>) {
        self.responses.lock().expect("fixture mutex poisoned").update_settings = Some(response);
    }

    pub fn set_force_merge_response(&self, response: Result<ForceMergeResponse, TransportError>) {
        self.responses.lock().expect("fixture mutex poisoned").force_merge = Some(response);
    }

    pub fn set_downsample_response(&self, response: Result<DownsampleResponse, TransportError>) {
        self.responses.lock().expect("fixture mutex poisoned").downsample = Some(response);
    }
}

impl Default for TransportFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Transport backend for unit tests: acknowledges everything unless a response was preset.
#[derive(Clone)]
pub struct TransportFixtureBackend {
    send_call: Sender<TransportCall>,
    responses: Arc<StdMutex<Responses>>,
}

#[async_trait]
impl TransportBackend for TransportFixtureBackend {
    async fn rollover(
        &self,
        _context: &Context,
        request: &RolloverRequest,
    ) -> Result<RolloverResponse, TransportError> {
        let _ = self.send_call.send(TransportCall::Rollover(request.clone()));
        self.responses
            .lock()
            .expect("fixture mutex poisoned")
            .rollover
            .take()
            .unwrap_or(Ok(RolloverResponse { acknowledged: true }))
    }

    async fn delete_index(
        &self,
        _context: &Context,
        request: &DeleteIndexRequest,
    ) -> Result<DeleteIndexResponse, TransportError> {
        let _ = self.send_call.send(TransportCall::DeleteIndex(request.clone()));
        self.responses
            .lock()
            .expect("fixture mutex poisoned")
            .delete_index
            .take()
            .unwrap_or(Ok(DeleteIndexResponse { acknowledged: true }))
    }

    async fn add_write_block(
        &self,
        _context: &Context,
        request: &AddWriteBlockRequest,
    ) -> Result<AddWriteBlockResponse, TransportError> {
        let _ = self.send_call.send(TransportCall::AddWriteBlock(request.clone()));
        self.responses
            .lock()
            .expect("fixture mutex poisoned")
            .add_write_block
            .take()
            .unwrap_or(Ok(AddWriteBlockResponse {
                acknowledged: true,
                shard_failures: Vec::new(),
            }))
    }

    async fn update_settings(
        &self,
        _context: &Context,
        request: &UpdateSettingsRequest,
    ) -> Result<UpdateSettingsResponse, TransportError> {
        let _ = self.send_call.send(TransportCall::UpdateSettings(request.clone()));
        self.responses
            .lock()
            .expect("fixture mutex poisoned")
            .update_settings
            .take()
            .unwrap_or(Ok(UpdateSettingsResponse { acknowledged: true }))
    }

    async fn force_merge(
        &self,
        _context: &Context,
        request: &ForceMergeRequest,
    ) -> Result<ForceMergeResponse, TransportError> {
        let _ = self.send_call.send(TransportCall::ForceMerge(request.clone()));
        self.responses
            .lock()
            .expect("fixture mutex poisoned")
            .force_merge
            .take()
            .unwrap_or(Ok(ForceMergeResponse {
                total_shards: 1,
                successful_shards: 1,
                failed_shards: 0,
            }))
    }

    async fn downsample(
        &self,
        _context: &Context,
        request: &DownsampleRequest,
    ) -> Result<DownsampleResponse, TransportError> {
        let _ = self.send_call.send(TransportCall::Downsample(request.clone()));
        self.responses
            .lock()
            .expect("fixture mutex poisoned")
            .downsample
            .take()
            .unwrap_or(Ok(DownsampleResponse { acknowledged: true }))
    }
}
