//! Per-list reconcile loop
//!
//! Each loop follows its list's delta feed and mirrors changed tasks into the
//! record store: fetch, classify, apply, sleep, repeat until cancelled.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument, Span};

use super::schedule::{Pause, PollSchedule};
use crate::record::{RecordFields, RecordStore};
use crate::task::{DeltaCursor, Task, TaskList, TaskSource};
use crate::Result;

/// Per-round tally of applied tasks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Result of one fetch-classify-apply pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// The fetch failed; the cursor is unchanged
    FetchFailed,
    /// The page carried a next link; its tasks were not applied
    Partial,
    /// The page carried a delta link and its tasks were applied
    Synced(SyncReport),
}

impl RoundOutcome {
    /// Pause to take before the next round
    pub fn pause(&self) -> Pause {
        match self {
            Self::FetchFailed => Pause::Retry,
            Self::Partial => Pause::Page,
            Self::Synced(_) => Pause::Idle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Applied {
    Created,
    Updated,
    Deleted,
    Skipped,
}

/// Sync loop for a single task list
pub struct Reconciler<S, D> {
    list: TaskList,
    source: Arc<S>,
    store: Arc<D>,
    schedule: PollSchedule,
    cursor: DeltaCursor,
    span: Span,
}

impl<S, D> Reconciler<S, D>
where
    S: TaskSource,
    D: RecordStore,
{
    pub fn new(list: TaskList, source: Arc<S>, store: Arc<D>, schedule: PollSchedule) -> Self {
        let span = info_span!("sync_loop", task_list = %list.display_name);
        Self {
            list,
            source,
            store,
            schedule,
            cursor: DeltaCursor::Start,
            span,
        }
    }

    pub fn list(&self) -> &TaskList {
        &self.list
    }

    pub fn cursor(&self) -> &DeltaCursor {
        &self.cursor
    }

    /// Run until `cancel` fires.
    ///
    /// With `from_latest`, the loop first seeks to the head of the change feed so
    /// only changes made after startup are mirrored.
    pub async fn run(mut self, cancel: CancellationToken, from_latest: bool) {
        let span = self.span.clone();
        async move {
            if !self.pause(Pause::Startup, &cancel).await {
                return;
            }
            if from_latest && !self.seek_latest(&cancel).await {
                return;
            }

            info!(list_id = %self.list.id, "sync loop started");
            loop {
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    outcome = self.round() => outcome,
                };
                if !self.pause(outcome.pause(), &cancel).await {
                    break;
                }
            }
            info!("sync loop stopped");
        }
        .instrument(span)
        .await
    }

    /// Fetch one delta page and apply it if it closes a round
    pub async fn round(&mut self) -> RoundOutcome {
        let page = match self.source.delta(&self.list.id, &self.cursor).await {
            Ok(page) => page,
            Err(e) => {
                warn!(error = %e, "failed to fetch task delta");
                return RoundOutcome::FetchFailed;
            }
        };

        match page.cursor {
            DeltaCursor::Delta(_) => {
                let report = self.apply(&page.tasks).await;
                debug!(?report, "delta round applied");
                self.cursor = page.cursor;
                RoundOutcome::Synced(report)
            }
            DeltaCursor::Next(_) => {
                debug!(
                    pending = page.tasks.len(),
                    "not a delta link yet, following next link"
                );
                self.cursor = page.cursor;
                RoundOutcome::Partial
            }
            DeltaCursor::Start => {
                warn!("delta page returned without a cursor");
                RoundOutcome::FetchFailed
            }
        }
    }

    async fn apply(&self, tasks: &[Task]) -> SyncReport {
        let mut report = SyncReport::default();
        for task in tasks {
            match self.apply_task(task).await {
                Ok(Applied::Created) => report.created += 1,
                Ok(Applied::Updated) => report.updated += 1,
                Ok(Applied::Deleted) => report.deleted += 1,
                Ok(Applied::Skipped) => report.skipped += 1,
                Err(e) => {
                    warn!(task_id = %task.id, error = %e, "failed to mirror task");
                    report.failed += 1;
                }
            }
        }
        report
    }

    async fn apply_task(&self, task: &Task) -> Result<Applied> {
        if task.is_deleted() {
            debug!(task_id = %task.id, "task delete >>>>");
            self.store.mark_deleted(&task.id).await?;
            return Ok(Applied::Deleted);
        }

        if task.display_name.is_empty() {
            warn!(task_id = %task.id, "task display name is empty, skipping");
            return Ok(Applied::Skipped);
        }

        match self.store.find_by_task_id(&task.id).await? {
            Some(record) => {
                debug!(task = %task.display_name, "task update >>>>");
                let fields = update_fields(task, &self.list.display_name)?;
                self.store.update(&record, fields).await?;
                Ok(Applied::Updated)
            }
            None => {
                debug!(task = %task.display_name, "task create >>>>");
                let fields = create_fields(task, &self.list.display_name)?;
                self.store.create(fields).await?;
                Ok(Applied::Created)
            }
        }
    }

    async fn seek_latest(&mut self, cancel: &CancellationToken) -> bool {
        loop {
            let latest = tokio::select! {
                biased;
                _ = cancel.cancelled() => return false,
                latest = self.source.latest_delta(&self.list.id) => latest,
            };
            match latest {
                Ok(cursor) => {
                    debug!("starting from latest delta checkpoint");
                    self.cursor = cursor;
                    return true;
                }
                Err(e) => {
                    warn!(error = %e, "failed to fetch latest delta checkpoint");
                    if !self.pause(Pause::Retry, cancel).await {
                        return false;
                    }
                }
            }
        }
    }

    /// Sleep for a drawn pause; false if cancelled first
    async fn pause(&self, pause: Pause, cancel: &CancellationToken) -> bool {
        let delay = self.schedule.draw(pause);
        debug!(?pause, delay_ms = delay.as_millis() as u64, "sleeping");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}

/// Fields for a task seen for the first time
pub fn create_fields(task: &Task, list_name: &str) -> Result<RecordFields> {
    let completed = task.is_completed();
    Ok(RecordFields {
        title: Some(task.display_name.clone()),
        task_id: Some(task.id.clone()),
        done: completed.then_some(true),
        deleted: None,
        priority: task.importance.as_ref().map(|i| i.priority()),
        task_list_name: Some(list_name.to_string()),
        scheduled: task.scheduled_time()?,
        completed_at: if completed { task.completed_time()? } else { None },
    })
}

/// Fields for a task that already has a record
pub fn update_fields(task: &Task, list_name: &str) -> Result<RecordFields> {
    Ok(RecordFields {
        title: non_empty(&task.display_name),
        task_id: None,
        done: Some(task.is_completed()),
        deleted: Some(false),
        priority: task.importance.as_ref().map(|i| i.priority()),
        task_list_name: non_empty(list_name),
        scheduled: task.scheduled_time()?,
        completed_at: task.completed_time()?,
    })
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
