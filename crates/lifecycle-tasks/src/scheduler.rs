//! Periodic job scheduler adapter (§4.3, §6 `poll_interval`).
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use replicore_lifecycle_context::Context;

/// A unit of periodic work the scheduler invokes on every tick.
#[async_trait]
pub trait SchedulerJob: Send + Sync {
    async fn run(&self, context: &Context);
}

/// Registers a named job; fires it at a configurable interval until removed.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<dyn SchedulerBackend>,
}

impl Scheduler {
    /// Register `job` under `name`, replacing any previous registration under the same name.
    ///
    /// Re-registering (e.g. after a `poll_interval` settings update) takes effect on the next
    /// tick; the previous registration's in-flight tick, if any, is not interrupted.
    pub async fn add(
        &self,
        context: &Context,
        name: &'static str,
        interval: Duration,
        job: Arc<dyn SchedulerJob>,
    ) {
        self.inner.add(context, name, interval, job).await;
    }

    /// Unregister a job; its currently running tick (if any) is cancelled immediately.
    pub async fn remove(&self, name: &'static str) {
        self.inner.remove(name).await;
    }

    /// Unregister every job. Used when the owning process is shutting down.
    pub async fn stop(&self) {
        self.inner.stop().await;
    }
}

impl<T> From<T> for Scheduler
where
    T: SchedulerBackend + 'static,
{
    fn from(value: T) -> Self {
        Scheduler {
            inner: Arc::new(value),
        }
    }
}

/// Operations implemented by the cluster's periodic job scheduler.
#[async_trait]
pub trait SchedulerBackend: Send + Sync {
    async fn add(
        &self,
        context: &Context,
        name: &'static str,
        interval: Duration,
        job: Arc<dyn SchedulerJob>,
    );
    async fn remove(&self, name: &'static str);
    async fn stop(&self);
}

/// `tokio`-backed scheduler: one background task per registered job, ticking on a
/// [`tokio::time::interval`].
#[derive(Default)]
pub struct TokioScheduler {
    jobs: Mutex<HashMap<&'static str, JoinHandle<()>>>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SchedulerBackend for TokioScheduler {
    async fn add(
        &self,
        context: &Context,
        name: &'static str,
        interval: Duration,
        job: Arc<dyn SchedulerJob>,
    ) {
        self.remove(name).await;
        slog::debug!(context.logger, "Registering scheduled job"; "job" => name, "interval_secs" => interval.as_secs());
        let context = context.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; the controller wants to run on registration too.
            loop {
                ticker.tick().await;
                job.run(&context).await;
            }
        });
        self.jobs.lock().await.insert(name, handle);
    }

    async fn remove(&self, name: &'static str) {
        if let Some(handle) = self.jobs.lock().await.remove(name) {
            handle.abort();
        }
    }

    async fn stop(&self) {
        let mut jobs = self.jobs.lock().await;
        for (_, handle) in jobs.drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::*;

    struct CountingJob(Arc<AtomicUsize>);

    #[async_trait]
    impl SchedulerJob for CountingJob {
        async fn run(&self, _context: &Context) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn job_fires_on_interval() {
        let scheduler: Scheduler = TokioScheduler::new().into();
        let context = Context::fixture();
        let runs = Arc::new(AtomicUsize::new(0));
        let job = Arc::new(CountingJob(runs.clone()));

        scheduler
            .add(&context, "test_job", Duration::from_secs(1), job)
            .await;
        tokio::time::advance(Duration::from_millis(3500)).await;
        tokio::task::yield_now().await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn remove_stops_future_ticks() {
        let scheduler: Scheduler = TokioScheduler::new().into();
        let context = Context::fixture();
        let runs = Arc::new(AtomicUsize::new(0));
        let job = Arc::new(CountingJob(runs.clone()));

        scheduler
            .add(&context, "test_job", Duration::from_secs(1), job)
            .await;
        tokio::time::advance(Duration::from_millis(1500)).await;
        tokio::task::yield_now().await;
        scheduler.remove("test_job").await;
        tokio::time::advance(Duration::from_secs(5)).await;
        tokio::task::yield_now().await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
