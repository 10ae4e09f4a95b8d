use crate::api::types::PullResponse;

/// Result of a completed pull, as held by the post-pull workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullResult {
    pub success: bool,
    pub message: String,
    pub changes: Vec<String>,
    pub conflicts: Vec<String>,
    pub sql_migrations: Vec<String>,
    pub build_dashboard_changes: Vec<String>,
    pub should_reload: bool,
}

/// A pull the API refused or could not complete. Never enters the workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullFailure {
    pub message: String,
    pub conflicts: Vec<String>,
    /// Local changes that blocked the pull, when the API reports them.
    pub changes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    Completed(PullResult),
    Failed(PullFailure),
}

impl From<PullResponse> for PullOutcome {
    fn from(response: PullResponse) -> Self {
        let message = response.message.unwrap_or_default();
        if !response.success {
            return PullOutcome::Failed(PullFailure {
                message: if message.is_empty() {
                    "Pull failed".to_string()
                } else {
                    message
                },
                conflicts: response.conflicts.unwrap_or_default(),
                changes: response.changes.unwrap_or_default(),
            });
        }

        PullOutcome::Completed(PullResult {
            success: true,
            message,
            changes: response.changes.unwrap_or_default(),
            conflicts: response.conflicts.unwrap_or_default(),
            sql_migrations: response.sql_migrations.unwrap_or_default(),
            build_dashboard_changes: response.build_dashboard_changes.unwrap_or_default(),
            should_reload: response.should_reload.unwrap_or(false),
        })
    }
}

/// Which notice the operator has to acknowledge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogKind {
    SqlMigrations,
    BuildDashboardChanges,
}

impl DialogKind {
    pub fn title(self) -> &'static str {
        match self {
            DialogKind::SqlMigrations => "SQL migrations pending",
            DialogKind::BuildDashboardChanges => "Build dashboard files changed",
        }
    }
}
