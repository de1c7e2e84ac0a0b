//! Loop supervisor
//!
//! Discovers task lists once and runs one reconcile loop per list.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::reconciler::Reconciler;
use super::schedule::PollSchedule;
use crate::record::RecordStore;
use crate::task::TaskSource;
use crate::Result;

/// Configuration shared by every loop
#[derive(Debug, Clone, Default)]
pub struct SupervisorConfig {
    pub schedule: PollSchedule,
    /// Seek each list to its latest checkpoint before polling
    pub start_from_latest: bool,
}

/// Runs one [`Reconciler`] per task list
pub struct Supervisor<S, D> {
    source: Arc<S>,
    store: Arc<D>,
    config: SupervisorConfig,
}

impl<S, D> Supervisor<S, D>
where
    S: TaskSource + 'static,
    D: RecordStore + 'static,
{
    pub fn new(source: Arc<S>, store: Arc<D>, config: SupervisorConfig) -> Self {
        Self {
            source,
            store,
            config,
        }
    }

    /// List task lists, start their loops, and wait for all of them to stop.
    ///
    /// Fails only if the initial listing fails. Loops stop when `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let lists = self.source.list_task_lists().await?;
        info!(count = lists.len(), "discovered task lists");

        if lists.is_empty() {
            warn!("no task lists to sync, waiting for shutdown");
            cancel.cancelled().await;
            return Ok(());
        }

        let handles: Vec<_> = lists
            .into_iter()
            .map(|list| {
                info!(list_id = %list.id, name = %list.display_name, "starting sync loop");
                let reconciler = Reconciler::new(
                    list,
                    Arc::clone(&self.source),
                    Arc::clone(&self.store),
                    self.config.schedule.clone(),
                );
                tokio::spawn(reconciler.run(cancel.child_token(), self.config.start_from_latest))
            })
            .collect();

        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                error!("sync loop terminated abnormally: {}", e);
            }
        }

        info!("all sync loops stopped");
        Ok(())
    }
}
