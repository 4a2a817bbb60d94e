//! Wires the lifecycle controller's components into a running process.
use std::sync::Arc;

use replicore_lifecycle_context::Context;
use replicore_lifecycle_master::ClusterMetadataService;
use replicore_lifecycle_master::MasterLifecycle;
use replicore_lifecycle_run::ClusterTaskClient;
use replicore_lifecycle_run::ErrorStore;
use replicore_lifecycle_run::LifecycleRun;
use replicore_lifecycle_run::Settings;
use replicore_lifecycle_run::TransportClient;
use replicore_lifecycle_tasks::Scheduler;
use replicore_lifecycle_tasks::TokioScheduler;

mod backends;
mod logging;

/// Container for all process-global dependencies the lifecycle controller needs (§1.1: "a small
/// `Injector`-style container wiring the error store, both deduplicators, the transport client and
/// the cluster-state task queues together").
pub struct Injector {
    pub context: Context,
    pub master: MasterLifecycle,
}

impl Injector {
    /// Assemble every component with the out-of-scope collaborators (cluster metadata, transport,
    /// cluster-state task queue) supplied by the caller.
    pub fn assemble(
        cluster: Arc<dyn ClusterMetadataService>,
        transport_backend: impl replicore_lifecycle_transport::TransportBackend + 'static,
        tasks_backend: impl replicore_lifecycle_tasks::ClusterStateTaskQueueBackend + 'static,
        settings: Settings,
    ) -> Self {
        let logger = logging::configure();
        let context = Context::root(logger).build();

        let errors = Arc::new(ErrorStore::new());
        let transport = TransportClient::new(transport_backend, errors.clone());
        let cluster_tasks = ClusterTaskClient::new(tasks_backend.into());
        let lifecycle_run = Arc::new(LifecycleRun::new(
            transport.clone(),
            cluster_tasks.clone(),
            errors.clone(),
        ));
        let scheduler: Scheduler = TokioScheduler::new().into();
        let master = MasterLifecycle::new(
            scheduler,
            cluster,
            lifecycle_run,
            transport,
            cluster_tasks,
            errors,
            settings,
        );
        Injector { context, master }
    }

    /// Wire up the placeholder out-of-scope collaborators (§1) and the documented settings
    /// defaults (§6). Replace with [`Injector::assemble`] once real collaborators exist.
    pub fn assemble_with_defaults() -> Self {
        Self::assemble(
            Arc::new(backends::ClusterMetadataNull),
            backends::TransportNull,
            backends::ClusterTasksNull,
            Settings::default(),
        )
    }
}

/// Run the controller until the process receives a shutdown signal.
///
/// Master-election notifications are an out-of-scope, externally-driven input (§1); this entry
/// point assumes a single-node deployment and declares mastership immediately on startup.
pub async fn run() -> anyhow::Result<()> {
    let injector = Injector::assemble_with_defaults();
    injector.master.on_election_change(&injector.context, true).await;

    slog::info!(injector.context.logger, "Data stream lifecycle controller running");
    tokio::signal::ctrl_c().await?;
    slog::info!(injector.context.logger, "Shutdown signal received");
    injector.master.on_election_change(&injector.context, false).await;
    Ok(())
}
