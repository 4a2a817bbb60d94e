//! Adapters over the periodic scheduler (§4.3) and the cluster-state task queue (§4.7).
//!
//! Both are thin wrappers over capabilities the surrounding cluster process actually supplies;
//! the controller only ever consumes the interfaces defined here.
mod queue;
mod scheduler;

pub use self::queue::ClusterStateMutation;
pub use self::queue::ClusterStateTaskQueue;
pub use self::queue::ClusterStateTaskQueueBackend;
pub use self::queue::Priority;
pub use self::scheduler::Scheduler;
pub use self::scheduler::SchedulerBackend;
pub use self::scheduler::SchedulerJob;
pub use self::scheduler::TokioScheduler;

#[cfg(any(test, feature = "test-fixture"))]
pub use self::queue::ClusterStateTaskQueueFixture;
