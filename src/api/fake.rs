//! In-memory [`ConsoleApi`] for driver and monitor tests.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::{AppError, Result};
use crate::workflow::types::PullOutcome;

use super::types::*;
use super::ConsoleApi;

pub(crate) struct FakeConsoleApi {
    pub pull_outcome: Mutex<Option<PullOutcome>>,
    pub pull_requests: Mutex<Vec<PullOptions>>,
    pub reload_calls: Mutex<Vec<Instant>>,
    pub fail_reload: bool,
    /// Answer reloads with `success: false` instead of an error status.
    pub refuse_reload: bool,
    pub fail_build_status: bool,
    pub branches: BranchList,
}

impl FakeConsoleApi {
    pub fn new() -> Self {
        Self {
            pull_outcome: Mutex::new(None),
            pull_requests: Mutex::new(Vec::new()),
            reload_calls: Mutex::new(Vec::new()),
            fail_reload: false,
            refuse_reload: false,
            fail_build_status: false,
            branches: BranchList {
                current: Some("main".to_string()),
                local: vec!["main".to_string()],
                remote: vec!["main".to_string(), "develop".to_string()],
            },
        }
    }

    pub fn with_pull_outcome(self, outcome: PullOutcome) -> Self {
        *self.pull_outcome.lock().unwrap() = Some(outcome);
        self
    }

    pub fn reload_count(&self) -> usize {
        self.reload_calls.lock().unwrap().len()
    }

    pub fn reload_times(&self) -> Vec<Instant> {
        self.reload_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConsoleApi for FakeConsoleApi {
    async fn branches(&self) -> Result<BranchList> {
        Ok(self.branches.clone())
    }

    async fn detailed_status(&self) -> Result<DetailedGitStatus> {
        Ok(DetailedGitStatus {
            branch: "main".to_string(),
            clean: true,
            ..DetailedGitStatus::default()
        })
    }

    async fn pull(&self, options: &PullOptions) -> Result<PullOutcome> {
        self.pull_requests.lock().unwrap().push(options.clone());
        self.pull_outcome
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AppError::Api {
                status: 500,
                message: "no pull outcome configured".to_string(),
            })
    }

    async fn reload_dev(&self) -> Result<ReloadResponse> {
        self.reload_calls.lock().unwrap().push(Instant::now());
        if self.fail_reload {
            return Err(AppError::Api {
                status: 500,
                message: "pm2 not installed".to_string(),
            });
        }
        if self.refuse_reload {
            return Ok(ReloadResponse {
                success: false,
                message: Some("PM2 app 'app-dev' is not online (status: stopped)".to_string()),
            });
        }
        Ok(ReloadResponse {
            success: true,
            message: Some("Successfully reloaded 'app-dev'".to_string()),
        })
    }

    async fn server_health(&self, _env: Environment) -> Result<ServerHealth> {
        Ok(ServerHealth {
            uptime: Some(3600.0),
            cpu: CpuUsage {
                percent: 12.5,
                cores: 4,
            },
            ..ServerHealth::default()
        })
    }

    async fn env_git_status(&self, _env: Environment) -> Result<EnvGitStatus> {
        Ok(EnvGitStatus {
            branch: "main".to_string(),
            commit: "0123456789abcdef".to_string(),
            ..EnvGitStatus::default()
        })
    }

    async fn build_status(&self) -> Result<BuildStatus> {
        if self.fail_build_status {
            return Err(AppError::Api {
                status: 503,
                message: "build service unavailable".to_string(),
            });
        }
        Ok(BuildStatus {
            status: "idle".to_string(),
            ..BuildStatus::default()
        })
    }

    async fn preview_pull(&self, _env: Environment) -> Result<PullPreview> {
        Ok(PullPreview {
            success: true,
            has_changes: false,
            message: Some("Already up to date".to_string()),
            ..PullPreview::default()
        })
    }
}
