//! Post-pull decision workflow.
//!
//! After a pull completes the operator may have to acknowledge pending SQL
//! migrations, then changed build-dashboard files, before the dev server is
//! restarted. [`PostPullWorkflow::transition`] is the only mutator; it never
//! performs I/O and instead returns the [`Effect`]s a driver must carry out.

use std::time::Duration;

use crate::config::WorkflowConfig;

use super::types::{DialogKind, PullResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    MigrationDialogOpen,
    BuildDialogOpen,
    RestartPending,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    /// A pull succeeded. Failed pulls are never fed to the workflow.
    PullCompleted(PullResult),
    MigrationDialogDismissed,
    BuildDialogDismissed,
    /// The timer behind a [`Effect::ScheduleRestart`] elapsed.
    RestartTimerFired { ticket: u64 },
    /// Operator asked for a restart directly.
    RestartRequested,
    /// The driver is shutting down and drops any restart still waiting.
    RestartCancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    OpenDialog { kind: DialogKind, items: Vec<String> },
    ScheduleRestart { ticket: u64, delay: Duration },
    CancelScheduledRestart { ticket: u64 },
    Restart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartDelays {
    /// Used when the restart is scheduled straight from a pull completion.
    pub after_pull: Duration,
    /// Used when the restart is reached by dismissing the migration dialog.
    pub after_migrations: Duration,
}

impl Default for RestartDelays {
    fn default() -> Self {
        Self {
            after_pull: Duration::from_millis(2000),
            after_migrations: Duration::from_millis(1000),
        }
    }
}

impl From<&WorkflowConfig> for RestartDelays {
    fn from(config: &WorkflowConfig) -> Self {
        Self {
            after_pull: Duration::from_millis(config.restart_delay_ms),
            after_migrations: Duration::from_millis(config.post_migration_restart_delay_ms),
        }
    }
}

/// Where in the decision chain evaluation starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Migrations,
    BuildChanges,
}

#[derive(Debug)]
pub struct PostPullWorkflow {
    state: WorkflowState,
    result: Option<PullResult>,
    delays: RestartDelays,
    pending_ticket: Option<u64>,
    next_ticket: u64,
}

impl Default for PostPullWorkflow {
    fn default() -> Self {
        Self::new(RestartDelays::default())
    }
}

impl PostPullWorkflow {
    pub fn new(delays: RestartDelays) -> Self {
        Self {
            state: WorkflowState::Idle,
            result: None,
            delays,
            pending_ticket: None,
            next_ticket: 1,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn pull_result(&self) -> Option<&PullResult> {
        self.result.as_ref()
    }

    /// Ticket of the restart currently waiting on its timer, if any.
    pub fn pending_restart(&self) -> Option<u64> {
        self.pending_ticket
    }

    pub fn transition(&mut self, event: WorkflowEvent) -> Vec<Effect> {
        match event {
            WorkflowEvent::PullCompleted(result) => {
                let mut effects = Vec::new();
                // A new pull supersedes a restart still waiting from the previous one.
                if let Some(ticket) = self.pending_ticket.take() {
                    tracing::info!(ticket, "Superseding pending restart");
                    effects.push(Effect::CancelScheduledRestart { ticket });
                }
                self.result = Some(result);
                self.state = WorkflowState::Idle;
                effects.extend(self.decide(Step::Migrations, self.delays.after_pull));
                effects
            }
            WorkflowEvent::MigrationDialogDismissed => {
                if self.state != WorkflowState::MigrationDialogOpen {
                    tracing::debug!(state = ?self.state, "Ignoring stray migration dialog dismissal");
                    return Vec::new();
                }
                self.decide(Step::BuildChanges, self.delays.after_migrations)
            }
            WorkflowEvent::BuildDialogDismissed => {
                if self.state != WorkflowState::BuildDialogOpen {
                    tracing::debug!(state = ?self.state, "Ignoring stray build dialog dismissal");
                    return Vec::new();
                }
                // Dismissing the build dialog ends the cycle without a reload check.
                self.state = WorkflowState::Done;
                Vec::new()
            }
            WorkflowEvent::RestartTimerFired { ticket } => {
                if self.pending_ticket != Some(ticket) {
                    tracing::debug!(ticket, "Ignoring superseded restart timer");
                    return Vec::new();
                }
                self.pending_ticket = None;
                self.state = WorkflowState::Done;
                vec![Effect::Restart]
            }
            WorkflowEvent::RestartRequested => vec![Effect::Restart],
            WorkflowEvent::RestartCancelled => {
                let Some(ticket) = self.pending_ticket.take() else {
                    return Vec::new();
                };
                tracing::info!(ticket, "Cancelling pending restart");
                self.state = WorkflowState::Done;
                vec![Effect::CancelScheduledRestart { ticket }]
            }
        }
    }

    fn decide(&mut self, from: Step, restart_delay: Duration) -> Vec<Effect> {
        let Some(result) = self.result.as_ref() else {
            self.state = WorkflowState::Done;
            return Vec::new();
        };

        if from == Step::Migrations && !result.sql_migrations.is_empty() {
            let items = result.sql_migrations.clone();
            self.state = WorkflowState::MigrationDialogOpen;
            return vec![Effect::OpenDialog {
                kind: DialogKind::SqlMigrations,
                items,
            }];
        }

        if !result.build_dashboard_changes.is_empty() {
            let items = result.build_dashboard_changes.clone();
            self.state = WorkflowState::BuildDialogOpen;
            return vec![Effect::OpenDialog {
                kind: DialogKind::BuildDashboardChanges,
                items,
            }];
        }

        if result.should_reload {
            let ticket = self.next_ticket;
            self.next_ticket += 1;
            self.pending_ticket = Some(ticket);
            self.state = WorkflowState::RestartPending;
            return vec![Effect::ScheduleRestart {
                ticket,
                delay: restart_delay,
            }];
        }

        self.state = WorkflowState::Done;
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pull(migrations: &[&str], build: &[&str], should_reload: bool) -> PullResult {
        PullResult {
            success: true,
            message: "Successfully pulled".to_string(),
            sql_migrations: migrations.iter().map(|s| s.to_string()).collect(),
            build_dashboard_changes: build.iter().map(|s| s.to_string()).collect(),
            should_reload,
            ..PullResult::default()
        }
    }

    fn count_restarts(effects: &[Effect]) -> usize {
        effects
            .iter()
            .filter(|e| matches!(e, Effect::Restart | Effect::ScheduleRestart { .. }))
            .count()
    }

    #[test]
    fn test_migrations_open_only_migration_dialog() {
        let mut wf = PostPullWorkflow::default();
        let effects = wf.transition(WorkflowEvent::PullCompleted(pull(
            &["migrations/001.sql"],
            &["Documentation_new/build-dashboard/app.js"],
            true,
        )));

        assert_eq!(
            effects,
            vec![Effect::OpenDialog {
                kind: DialogKind::SqlMigrations,
                items: vec!["migrations/001.sql".to_string()],
            }]
        );
        assert_eq!(wf.state(), WorkflowState::MigrationDialogOpen);
        assert!(wf.pending_restart().is_none());
    }

    #[test]
    fn test_build_changes_open_only_build_dialog() {
        let mut wf = PostPullWorkflow::default();
        let effects = wf.transition(WorkflowEvent::PullCompleted(pull(
            &[],
            &["Documentation_new/build-dashboard/app.js"],
            true,
        )));

        assert_eq!(
            effects,
            vec![Effect::OpenDialog {
                kind: DialogKind::BuildDashboardChanges,
                items: vec!["Documentation_new/build-dashboard/app.js".to_string()],
            }]
        );
        assert_eq!(wf.state(), WorkflowState::BuildDialogOpen);
    }

    #[test]
    fn test_reload_only_schedules_restart_after_pull_delay() {
        let mut wf = PostPullWorkflow::default();
        let effects = wf.transition(WorkflowEvent::PullCompleted(pull(&[], &[], true)));

        assert_eq!(
            effects,
            vec![Effect::ScheduleRestart {
                ticket: 1,
                delay: Duration::from_millis(2000),
            }]
        );
        assert_eq!(wf.state(), WorkflowState::RestartPending);

        let effects = wf.transition(WorkflowEvent::RestartTimerFired { ticket: 1 });
        assert_eq!(effects, vec![Effect::Restart]);
        assert_eq!(wf.state(), WorkflowState::Done);
    }

    #[test]
    fn test_nothing_to_do_goes_straight_to_done() {
        let mut wf = PostPullWorkflow::default();
        let effects = wf.transition(WorkflowEvent::PullCompleted(pull(&[], &[], false)));

        assert!(effects.is_empty());
        assert_eq!(wf.state(), WorkflowState::Done);
    }

    #[test]
    fn test_build_dismissal_after_migrations_never_restarts() {
        let mut wf = PostPullWorkflow::default();
        let mut restarts = count_restarts(&wf.transition(WorkflowEvent::PullCompleted(pull(
            &["migrations/001.sql"],
            &["Documentation_new/build-dashboard/app.js"],
            true,
        ))));

        let effects = wf.transition(WorkflowEvent::MigrationDialogDismissed);
        restarts += count_restarts(&effects);
        assert!(matches!(
            effects.as_slice(),
            [Effect::OpenDialog {
                kind: DialogKind::BuildDashboardChanges,
                ..
            }]
        ));
        assert_eq!(wf.state(), WorkflowState::BuildDialogOpen);

        restarts += count_restarts(&wf.transition(WorkflowEvent::BuildDialogDismissed));
        assert_eq!(restarts, 0);
        assert_eq!(wf.state(), WorkflowState::Done);
        assert!(wf.pending_restart().is_none());
    }

    #[test]
    fn test_migration_dismissal_uses_shorter_restart_delay() {
        let mut wf = PostPullWorkflow::default();
        wf.transition(WorkflowEvent::PullCompleted(pull(&["migrations/001.sql"], &[], true)));

        let effects = wf.transition(WorkflowEvent::MigrationDialogDismissed);
        assert_eq!(
            effects,
            vec![Effect::ScheduleRestart {
                ticket: 1,
                delay: Duration::from_millis(1000),
            }]
        );
    }

    #[test]
    fn test_migration_dismissal_without_reload_is_done() {
        let mut wf = PostPullWorkflow::default();
        wf.transition(WorkflowEvent::PullCompleted(pull(&["migrations/001.sql"], &[], false)));

        assert!(wf.transition(WorkflowEvent::MigrationDialogDismissed).is_empty());
        assert_eq!(wf.state(), WorkflowState::Done);
    }

    #[test]
    fn test_manual_restart_in_every_state() {
        let mut wf = PostPullWorkflow::default();
        assert_eq!(wf.transition(WorkflowEvent::RestartRequested), vec![Effect::Restart]);

        wf.transition(WorkflowEvent::PullCompleted(pull(&["migrations/001.sql"], &[], true)));
        assert_eq!(wf.transition(WorkflowEvent::RestartRequested), vec![Effect::Restart]);
        assert_eq!(wf.state(), WorkflowState::MigrationDialogOpen);

        wf.transition(WorkflowEvent::MigrationDialogDismissed);
        assert_eq!(wf.state(), WorkflowState::RestartPending);
        assert_eq!(wf.transition(WorkflowEvent::RestartRequested), vec![Effect::Restart]);
        assert_eq!(wf.state(), WorkflowState::RestartPending);
        assert_eq!(wf.pending_restart(), Some(1));
    }

    #[test]
    fn test_new_pull_supersedes_pending_restart() {
        let mut wf = PostPullWorkflow::default();
        wf.transition(WorkflowEvent::PullCompleted(pull(&[], &[], true)));

        let effects = wf.transition(WorkflowEvent::PullCompleted(pull(&[], &[], true)));
        assert_eq!(
            effects,
            vec![
                Effect::CancelScheduledRestart { ticket: 1 },
                Effect::ScheduleRestart {
                    ticket: 2,
                    delay: Duration::from_millis(2000),
                },
            ]
        );

        // The first timer may still fire if cancellation raced it.
        assert!(wf.transition(WorkflowEvent::RestartTimerFired { ticket: 1 }).is_empty());
        assert_eq!(wf.state(), WorkflowState::RestartPending);
        assert_eq!(
            wf.transition(WorkflowEvent::RestartTimerFired { ticket: 2 }),
            vec![Effect::Restart]
        );
    }

    #[test]
    fn test_cancel_clears_pending_restart() {
        let mut wf = PostPullWorkflow::default();
        wf.transition(WorkflowEvent::PullCompleted(pull(&[], &[], true)));

        assert_eq!(
            wf.transition(WorkflowEvent::RestartCancelled),
            vec![Effect::CancelScheduledRestart { ticket: 1 }]
        );
        assert_eq!(wf.state(), WorkflowState::Done);
        assert!(wf.pending_restart().is_none());

        // A timer that raced the cancellation no longer restarts.
        assert!(wf.transition(WorkflowEvent::RestartTimerFired { ticket: 1 }).is_empty());
    }

    #[test]
    fn test_cancel_without_pending_restart_is_ignored() {
        let mut wf = PostPullWorkflow::default();
        assert!(wf.transition(WorkflowEvent::RestartCancelled).is_empty());
        assert_eq!(wf.state(), WorkflowState::Idle);

        wf.transition(WorkflowEvent::PullCompleted(pull(&["migrations/001.sql"], &[], true)));
        assert!(wf.transition(WorkflowEvent::RestartCancelled).is_empty());
        assert_eq!(wf.state(), WorkflowState::MigrationDialogOpen);
    }

    #[test]
    fn test_stray_dismissals_are_ignored() {
        let mut wf = PostPullWorkflow::default();
        assert!(wf.transition(WorkflowEvent::MigrationDialogDismissed).is_empty());
        assert!(wf.transition(WorkflowEvent::BuildDialogDismissed).is_empty());
        assert_eq!(wf.state(), WorkflowState::Idle);

        wf.transition(WorkflowEvent::PullCompleted(pull(&[], &["build-dashboard/x"], true)));
        assert!(wf.transition(WorkflowEvent::MigrationDialogDismissed).is_empty());
        assert_eq!(wf.state(), WorkflowState::BuildDialogOpen);
    }

    #[test]
    fn test_new_pull_overwrites_stored_result() {
        let mut wf = PostPullWorkflow::default();
        wf.transition(WorkflowEvent::PullCompleted(pull(&["migrations/001.sql"], &[], false)));
        wf.transition(WorkflowEvent::PullCompleted(pull(&[], &[], false)));

        assert_eq!(wf.state(), WorkflowState::Done);
        assert!(wf.pull_result().unwrap().sql_migrations.is_empty());
    }

    #[test]
    fn test_delays_from_config() {
        let config = WorkflowConfig {
            restart_delay_ms: 300,
            post_migration_restart_delay_ms: 100,
        };
        let delays = RestartDelays::from(&config);
        assert_eq!(delays.after_pull, Duration::from_millis(300));
        assert_eq!(delays.after_migrations, Duration::from_millis(100));
    }
}
