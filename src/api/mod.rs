pub mod client;
#[cfg(test)]
pub(crate) mod fake;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;
use crate::workflow::types::PullOutcome;
use types::*;

pub use client::HttpConsoleApi;

#[async_trait]
pub trait ConsoleApi: Send + Sync {
    /// List local and remote branches of the dev checkout.
    async fn branches(&self) -> Result<BranchList>;

    /// Working-tree status of the dev checkout.
    async fn detailed_status(&self) -> Result<DetailedGitStatus>;

    /// Pull into the dev checkout. API-level refusals come back as
    /// [`PullOutcome::Failed`], not as `Err`.
    async fn pull(&self, options: &PullOptions) -> Result<PullOutcome>;

    /// Reload the dev server process.
    async fn reload_dev(&self) -> Result<ReloadResponse>;

    /// Host metrics plus database health for an environment.
    async fn server_health(&self, env: Environment) -> Result<ServerHealth>;

    /// Branch and commit summary for an environment.
    async fn env_git_status(&self, env: Environment) -> Result<EnvGitStatus>;

    /// State of the current (or last) build.
    async fn build_status(&self) -> Result<BuildStatus>;

    /// Incoming commits and files, without pulling.
    async fn preview_pull(&self, env: Environment) -> Result<PullPreview>;
}
