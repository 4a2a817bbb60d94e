//! The periodic job the scheduler fires, gated on mastership (§4.3).
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::watch;

use replicore_lifecycle_context::Context;
use replicore_lifecycle_run::LifecycleRun;
use replicore_lifecycle_run::Settings;
use replicore_lifecycle_tasks::SchedulerJob;

use crate::cluster::ClusterMetadataService;

pub struct LifecycleJob {
    pub cluster: Arc<dyn ClusterMetadataService>,
    pub lifecycle_run: Arc<LifecycleRun>,
    pub settings: watch::Receiver<Settings>,
    pub is_master: watch::Receiver<bool>,
}

#[async_trait]
impl SchedulerJob for LifecycleJob {
    async fn run(&self, context: &Context) {
        // The scheduler may fire one last tick concurrently with a mastership-loss transition;
        // re-checking here (rather than trusting the registration) is what makes that race safe.
        if !*self.is_master.borrow() {
            return;
        }

        let snapshot = match self.cluster.state().await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                slog::trace!(context.logger, "Skipping lifecycle run"; "reason" => %error);
                return;
            }
        };

        let settings = self.settings.borrow().clone();
        self.lifecycle_run.run(context, &snapshot, &settings, OffsetDateTime::now_utc()).await;
    }
}
