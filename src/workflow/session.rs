//! Drives [`PostPullWorkflow`] against the live API and the operator.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::types::PullOptions;
use crate::api::ConsoleApi;
use crate::error::Result;
use crate::operator::{NoticeLevel, Operator};
use crate::report;

use super::machine::{Effect, PostPullWorkflow, RestartDelays, WorkflowEvent};
use super::types::{DialogKind, PullOutcome};

pub struct PullSession<A: ConsoleApi + ?Sized, O: Operator> {
    api: Arc<A>,
    operator: O,
    workflow: PostPullWorkflow,
    timer_tx: mpsc::UnboundedSender<u64>,
    timer_rx: mpsc::UnboundedReceiver<u64>,
    /// Scheduled restarts by ticket.
    timers: HashMap<u64, JoinHandle<()>>,
    restart_failures: usize,
}

impl<A: ConsoleApi + ?Sized, O: Operator> PullSession<A, O> {
    pub fn new(api: Arc<A>, operator: O, delays: RestartDelays) -> Self {
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        Self {
            api,
            operator,
            workflow: PostPullWorkflow::new(delays),
            timer_tx,
            timer_rx,
            timers: HashMap::new(),
            restart_failures: 0,
        }
    }

    pub fn workflow(&self) -> &PostPullWorkflow {
        &self.workflow
    }

    pub fn operator(&self) -> &O {
        &self.operator
    }

    /// Number of restart attempts that failed during this session.
    pub fn restart_failures(&self) -> usize {
        self.restart_failures
    }

    /// Pull, report the outcome, then run the post-pull workflow up to its
    /// first wait point.
    ///
    /// A failed pull is returned as-is and does not touch the workflow.
    pub async fn pull(&mut self, options: &PullOptions) -> Result<PullOutcome> {
        let outcome = self.api.pull(options).await?;

        let summary = report::render_pull_outcome(&outcome);
        match &outcome {
            PullOutcome::Completed(result) => {
                tracing::info!(
                    changes = result.changes.len(),
                    migrations = result.sql_migrations.len(),
                    build_changes = result.build_dashboard_changes.len(),
                    should_reload = result.should_reload,
                    "Pull completed"
                );
                self.operator.notify(NoticeLevel::Info, summary.trim_end());
                self.dispatch(WorkflowEvent::PullCompleted(result.clone()))
                    .await?;
            }
            PullOutcome::Failed(failure) => {
                tracing::warn!(
                    message = %failure.message,
                    conflicts = failure.conflicts.len(),
                    "Pull failed"
                );
                self.operator.notify(NoticeLevel::Error, summary.trim_end());
            }
        }

        Ok(outcome)
    }

    /// Restart the dev server now, whatever the workflow is doing.
    pub async fn request_restart(&mut self) -> Result<()> {
        self.dispatch(WorkflowEvent::RestartRequested).await
    }

    /// Wait for any scheduled restart to fire and carry it out.
    pub async fn settle(&mut self) -> Result<()> {
        while self.workflow.pending_restart().is_some() {
            let Some(ticket) = self.timer_rx.recv().await else {
                break;
            };
            self.timers.remove(&ticket);
            self.dispatch(WorkflowEvent::RestartTimerFired { ticket })
                .await?;
        }
        Ok(())
    }

    /// Abort every scheduled restart and close out the workflow's pending
    /// one. Returns how many timers were dropped.
    pub fn cancel_scheduled(&mut self) -> usize {
        // The drain below aborts the timer behind any returned cancellation.
        let _ = self.workflow.transition(WorkflowEvent::RestartCancelled);
        let count = self.timers.len();
        for (ticket, handle) in self.timers.drain() {
            tracing::info!(ticket, "Cancelling scheduled restart");
            handle.abort();
        }
        count
    }

    async fn dispatch(&mut self, event: WorkflowEvent) -> Result<()> {
        let mut queue = VecDeque::from([event]);
        while let Some(event) = queue.pop_front() {
            for effect in self.workflow.transition(event) {
                if let Some(next) = self.apply(effect).await? {
                    queue.push_back(next);
                }
            }
        }
        Ok(())
    }

    async fn apply(&mut self, effect: Effect) -> Result<Option<WorkflowEvent>> {
        match effect {
            Effect::OpenDialog { kind, items } => {
                self.operator.acknowledge(kind, &items).await?;
                Ok(Some(match kind {
                    DialogKind::SqlMigrations => WorkflowEvent::MigrationDialogDismissed,
                    DialogKind::BuildDashboardChanges => WorkflowEvent::BuildDialogDismissed,
                }))
            }
            Effect::ScheduleRestart { ticket, delay } => {
                self.schedule_restart(ticket, delay);
                Ok(None)
            }
            Effect::CancelScheduledRestart { ticket } => {
                if let Some(handle) = self.timers.remove(&ticket) {
                    handle.abort();
                }
                Ok(None)
            }
            Effect::Restart => {
                self.restart().await;
                Ok(None)
            }
        }
    }

    fn schedule_restart(&mut self, ticket: u64, delay: Duration) {
        tracing::info!(ticket, delay_ms = delay.as_millis() as u64, "Scheduling dev server restart");
        self.operator.notify(
            NoticeLevel::Info,
            &format!("Restarting dev server in {:.1}s...", delay.as_secs_f64()),
        );

        let tx = self.timer_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(ticket);
        });
        self.timers.insert(ticket, handle);
    }

    /// Failures are reported to the operator and never retried.
    async fn restart(&mut self) {
        match self.api.reload_dev().await {
            Ok(response) if response.success => {
                let message = response
                    .message
                    .unwrap_or_else(|| "Dev server restarted".to_string());
                tracing::info!(%message, "Dev server restarted");
                self.operator.notify(NoticeLevel::Info, &message);
            }
            Ok(response) => {
                self.restart_failures += 1;
                let message = response
                    .message
                    .unwrap_or_else(|| "Dev server restart failed".to_string());
                tracing::error!(%message, "Dev server restart refused");
                self.operator.notify(NoticeLevel::Error, &message);
            }
            Err(e) => {
                self.restart_failures += 1;
                tracing::error!(error = %e, "Dev server restart failed");
                self.operator
                    .notify(NoticeLevel::Error, &format!("Failed to restart dev server: {e}"));
            }
        }
    }
}
