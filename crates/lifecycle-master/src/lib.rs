//! Gates the lifecycle job on master-election transitions and cluster recovery (§4.3).
mod cluster;
mod job;

use std::sync::Arc;

use tokio::sync::watch;

use replicore_lifecycle_context::Context;
use replicore_lifecycle_run::ClusterTaskClient;
use replicore_lifecycle_run::ErrorStore;
use replicore_lifecycle_run::LifecycleRun;
use replicore_lifecycle_run::Settings;
use replicore_lifecycle_run::TransportClient;
use replicore_lifecycle_tasks::Scheduler;

pub use crate::cluster::ClusterMetadataService;
#[cfg(any(test, feature = "test-fixture"))]
pub use crate::cluster::ClusterMetadataServiceFixture;

use crate::job::LifecycleJob;

/// Watches master-election transitions and settings updates; starts/stops the lifecycle job
/// accordingly, and clears shared in-flight/error state on mastership loss (§4.3, §5).
///
/// `MasterLifecycle` is constructed inert (the job is not registered until the first
/// non-master → master transition), matching the controller lifecycle described in §3.
pub struct MasterLifecycle {
    scheduler: Scheduler,
    cluster: Arc<dyn ClusterMetadataService>,
    lifecycle_run: Arc<LifecycleRun>,
    transport: TransportClient,
    cluster_tasks: ClusterTaskClient,
    errors: Arc<ErrorStore>,
    settings_tx: watch::Sender<Settings>,
    settings_rx: watch::Receiver<Settings>,
    is_master_tx: watch::Sender<bool>,
    is_master_rx: watch::Receiver<bool>,
}

impl MasterLifecycle {
    pub fn new(
        scheduler: Scheduler,
        cluster: Arc<dyn ClusterMetadataService>,
        lifecycle_run: Arc<LifecycleRun>,
        transport: TransportClient,
        cluster_tasks: ClusterTaskClient,
        errors: Arc<ErrorStore>,
        settings: Settings,
    ) -> Self {
        let (settings_tx, settings_rx) = watch::channel(settings);
        let (is_master_tx, is_master_rx) = watch::channel(false);
        MasterLifecycle {
            scheduler,
            cluster,
            lifecycle_run,
            transport,
            cluster_tasks,
            errors,
            settings_tx,
            settings_rx,
            is_master_tx,
            is_master_rx,
        }
    }

    /// Whether this node currently believes it is master.
    pub fn is_master(&self) -> bool {
        *self.is_master_rx.borrow()
    }

    /// React to a master-election transition delivered by the (out of scope) coordination
    /// service. Transitions to the same state are a no-op.
    pub async fn on_election_change(&self, context: &Context, is_master: bool) {
        let was_master = *self.is_master_rx.borrow();
        if was_master == is_master {
            return;
        }
        let _ = self.is_master_tx.send(is_master);

        if is_master {
            slog::info!(context.logger, "Gained mastership, starting lifecycle job");
            self.register_job(context).await;
        } else {
            slog::info!(context.logger, "Lost mastership, stopping lifecycle job");
            self.scheduler.remove(replicore_lifecycle_run::JOB_NAME).await;
            self.transport.clear_inflight().await;
            self.cluster_tasks.clear_inflight().await;
            self.errors.clear_all();
        }
    }

    /// Apply an updated settings document (§4.3, §6). Re-registers the job at the new
    /// `poll_interval` if this node is currently master; otherwise the new interval simply takes
    /// effect the next time mastership is gained.
    pub async fn update_settings(&self, context: &Context, settings: Settings) {
        if let Err(error) = settings.validate() {
            slog::error!(context.logger, "Rejected invalid settings update"; "error" => %error);
            return;
        }
        let interval_changed = self.settings_rx.borrow().poll_interval != settings.poll_interval;
        let _ = self.settings_tx.send(settings);
        if interval_changed && self.is_master() {
            self.register_job(context).await;
        }
    }

    async fn register_job(&self, context: &Context) {
        let interval = self.settings_rx.borrow().poll_interval;
        let job = Arc::new(LifecycleJob {
            cluster: self.cluster.clone(),
            lifecycle_run: self.lifecycle_run.clone(),
            settings: self.settings_rx.clone(),
            is_master: self.is_master_rx.clone(),
        });
        self.scheduler.add(context, replicore_lifecycle_run::JOB_NAME, interval, job).await;
    }
}
