use serde::{Deserialize, Serialize};

/// Deployment environment addressed by the `env` query parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Dev,
    Prod,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Prod => "prod",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BranchList {
    pub current: Option<String>,
    #[serde(default)]
    pub local: Vec<String>,
    #[serde(default)]
    pub remote: Vec<String>,
}

/// Working-tree status of the development checkout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailedGitStatus {
    pub branch: String,
    pub clean: bool,
    pub ahead: u32,
    pub behind: u32,
    #[serde(alias = "modified_files")]
    pub modified: Vec<String>,
    #[serde(alias = "staged_files")]
    pub added: Vec<String>,
    #[serde(alias = "deleted_files")]
    pub deleted: Vec<String>,
    #[serde(alias = "untracked_files")]
    pub untracked: Vec<String>,
}

/// Body of `POST /git/pull`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullOptions {
    pub stash_changes: bool,
    pub force: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

/// Raw pull response as the API sends it, success or failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub changes: Option<Vec<String>>,
    #[serde(default)]
    pub conflicts: Option<Vec<String>>,
    #[serde(default)]
    pub sql_migrations: Option<Vec<String>>,
    #[serde(default)]
    pub build_dashboard_changes: Option<Vec<String>>,
    #[serde(default)]
    pub should_reload: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReloadResponse {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CpuUsage {
    pub percent: f64,
    pub cores: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MemoryUsage {
    pub total_mb: u64,
    pub used_mb: u64,
    pub available_mb: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DiskUsage {
    pub total_gb: f64,
    pub free_gb: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseHealth {
    pub status: Option<String>,
    pub message: Option<String>,
    pub error: Option<String>,
}

/// Host metrics for one environment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerHealth {
    pub uptime: Option<f64>,
    pub timestamp: Option<String>,
    pub cpu: CpuUsage,
    pub memory: MemoryUsage,
    pub disk: DiskUsage,
    pub database: Option<DatabaseHealth>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EnvGitStatus {
    pub branch: String,
    pub commit: String,
    pub has_changes: bool,
    pub last_update: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BuildStatus {
    pub status: String,
    pub build_id: Option<String>,
    pub progress: Option<f64>,
    pub current_step: Option<String>,
    pub message: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncomingCommit {
    pub hash: String,
    pub message: String,
}

/// Changes `git pull` would bring in, computed without pulling.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PullPreview {
    pub success: bool,
    pub has_changes: bool,
    pub commits: Vec<IncomingCommit>,
    pub files: Vec<String>,
    pub buildmaster_files: Vec<String>,
    pub branch: Option<String>,
    pub message: Option<String>,
    pub error: Option<String>,
}

/// Error body shape shared by the console (`message`) and FastAPI (`detail`).
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub conflicts: Option<Vec<String>>,
}

impl ErrorBody {
    pub fn message(&self) -> Option<String> {
        self.message
            .clone()
            .or_else(|| {
                self.detail.as_ref().map(|d| match d {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
            })
            .or_else(|| self.error.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detailed_status_accepts_server_spellings() {
        let json = r#"{
            "branch": "develop",
            "clean": false,
            "ahead": 1,
            "behind": 3,
            "modified_files": ["src/app.ts"],
            "staged_files": ["src/new.ts"],
            "deleted_files": [],
            "untracked_files": ["notes.txt"],
            "suggestions": [{"type": "info"}]
        }"#;
        let status: DetailedGitStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.branch, "develop");
        assert_eq!(status.behind, 3);
        assert_eq!(status.modified, vec!["src/app.ts"]);
        assert_eq!(status.added, vec!["src/new.ts"]);
        assert_eq!(status.untracked, vec!["notes.txt"]);
    }

    #[test]
    fn test_pull_options_omit_missing_branch() {
        let options = PullOptions {
            stash_changes: true,
            force: false,
            branch: None,
        };
        let value = serde_json::to_value(&options).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"stash_changes": true, "force": false})
        );
    }

    #[test]
    fn test_reload_response_defaults_to_success() {
        let response: ReloadResponse = serde_json::from_str("{}").unwrap();
        assert!(response.success);
        assert!(response.message.is_none());
    }

    #[test]
    fn test_error_body_prefers_message_then_detail() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"detail": "Invalid or expired session token"}"#).unwrap();
        assert_eq!(
            body.message().as_deref(),
            Some("Invalid or expired session token")
        );

        let body: ErrorBody =
            serde_json::from_str(r#"{"message": "Pull failed", "detail": "x"}"#).unwrap();
        assert_eq!(body.message().as_deref(), Some("Pull failed"));
    }

    #[test]
    fn test_environment_lowercase_wire_name() {
        assert_eq!(serde_json::to_string(&Environment::Prod).unwrap(), "\"prod\"");
        assert_eq!(Environment::Dev.to_string(), "dev");
    }
}
