//! The cluster metadata service capability this controller consumes (§6), named by capability
//! only: the store itself, its change-notification bus, and cluster-state task execution are all
//! out of scope (§1) and supplied by the surrounding process.
use async_trait::async_trait;

use replicore_lifecycle_errors::ClusterStateNotRecovered;
use replicore_lifecycle_model::ClusterSnapshot;

/// Read access to the authoritative cluster metadata snapshot.
#[async_trait]
pub trait ClusterMetadataService: Send + Sync {
    /// The current snapshot, or an error while the cluster has the "state not recovered" block
    /// (§4.3: such notifications, and job ticks, must be ignored rather than acted on).
    async fn state(&self) -> Result<ClusterSnapshot, ClusterStateNotRecovered>;
}

#[cfg(any(test, feature = "test-fixture"))]
pub use self::fixture::ClusterMetadataServiceFixture;

#[cfg(any(test, feature = "test-fixture"))]
mod fixture {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use replicore_lifecycle_errors::ClusterStateNotRecovered;
    use replicore_lifecycle_model::ClusterSnapshot;

    use super::ClusterMetadataService;

    /// In-memory cluster metadata service for unit tests.
    ///
    /// Starts in the "not recovered" state, matching a freshly (re)started real cluster, until
    /// [`ClusterMetadataServiceFixture::set_state`] is called.
    #[derive(Default)]
    pub struct ClusterMetadataServiceFixture {
        snapshot: Mutex<Option<ClusterSnapshot>>,
    }

    impl ClusterMetadataServiceFixture {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_state(&self, snapshot: ClusterSnapshot) {
            *self.snapshot.lock().expect("fixture mutex poisoned") = Some(snapshot);
        }
    }

    #[async_trait]
    impl ClusterMetadataService for ClusterMetadataServiceFixture {
        async fn state(&self) -> Result<ClusterSnapshot, ClusterStateNotRecovered> {
            self.snapshot
                .lock()
                .expect("fixture mutex poisoned")
                .clone()
                .ok_or(ClusterStateNotRecovered)
        }
    }
}
