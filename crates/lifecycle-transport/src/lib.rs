//! Thin, idempotence-aware wrappers over the six transport actions the controller issues.
mod backend;
mod client;
mod error;
mod requests;

#[cfg(any(test, feature = "test-fixture"))]
mod fixture;

pub use crate::backend::TransportBackend;
pub use crate::client::TransportClient;
pub use crate::error::TransportError;
pub use crate::requests::AddWriteBlockRequest;
pub use crate::requests::AddWriteBlockResponse;
pub use crate::requests::DeleteIndexRequest;
pub use crate::requests::DeleteIndexResponse;
pub use crate::requests::DownsampleRequest;
pub use crate::requests::DownsampleResponse;
pub use crate::requests::ForceMergeRequest;
pub use crate::requests::ForceMergeResponse;
pub use crate::requests::RolloverRequest;
pub use crate::requests::RolloverResponse;
pub use crate::requests::TransportKey;
pub use crate::requests::UpdateSettingsRequest;
pub use crate::requests::UpdateSettingsResponse;

#[cfg(any(test, feature = "test-fixture"))]
pub use crate::fixture::TransportCall;
#[cfg(any(test, feature = "test-fixture"))]
pub use crate::fixture::TransportFixture;
#[cfg(any(test, feature = "test-fixture"))]
pub use crate::fixture::TransportFixtureBackend;
