use serde::Deserialize;
use std::time::Duration;

use crate::api::types::Environment;
use crate::error::{AppError, Result};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub pull: PullDefaults,
}

#[derive(Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub session_token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

// Manual Debug impl to avoid leaking the session token
impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            session_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Delays applied when the post-pull workflow schedules a restart.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkflowConfig {
    #[serde(default = "default_restart_delay_ms")]
    pub restart_delay_ms: u64,
    #[serde(default = "default_post_migration_restart_delay_ms")]
    pub post_migration_restart_delay_ms: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            restart_delay_ms: default_restart_delay_ms(),
            post_migration_restart_delay_ms: default_post_migration_restart_delay_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default)]
    pub env: Environment,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            env: Environment::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PullDefaults {
    #[serde(default = "default_stash_changes")]
    pub stash_changes: bool,
    #[serde(default)]
    pub force: bool,
}

impl Default for PullDefaults {
    fn default() -> Self {
        Self {
            stash_changes: default_stash_changes(),
            force: false,
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_restart_delay_ms() -> u64 {
    2000
}

fn default_post_migration_restart_delay_ms() -> u64 {
    1000
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_stash_changes() -> bool {
    true
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            builder = builder.add_source(config::File::with_name("deckhand").required(false));
        }

        // Environment variable overrides with DECKHAND_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("DECKHAND")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(AppError::Config("api.base_url must not be empty".to_string()));
        }
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(AppError::Config(format!(
                "api.base_url must be an http(s) URL, got: {}",
                self.api.base_url
            )));
        }
        if self.api.timeout_secs == 0 {
            return Err(AppError::Config("api.timeout_secs must be positive".to_string()));
        }
        if self.monitor.poll_interval_secs == 0 {
            return Err(AppError::Config(
                "monitor.poll_interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn session_token(&self) -> Option<&str> {
        self.api.session_token.as_deref()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.monitor.poll_interval_secs)
    }
}
