use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::workflow::types::{PullFailure, PullOutcome};

use super::types::*;
use super::ConsoleApi;

/// [`ConsoleApi`] over JSON/HTTP with bearer-token auth.
pub struct HttpConsoleApi {
    client: Client,
    base_url: String,
    session_token: Option<String>,
}

impl HttpConsoleApi {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
            session_token: config.session_token().map(str::to_string),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.session_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        tracing::debug!(path, "GET");
        let response = self
            .authorized(self.client.get(self.url(path)).query(query))
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Pass success responses through and turn the rest into an [`AppError`].
async fn check_status(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    Err(error_from(response).await)
}

/// Build the error for a non-success response, mining the body for a message.
async fn error_from(response: Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message())
        .unwrap_or(body);

    if status == StatusCode::UNAUTHORIZED {
        return AppError::Unauthorized(message);
    }
    AppError::Api {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl ConsoleApi for HttpConsoleApi {
    async fn branches(&self) -> Result<BranchList> {
        self.get_json("/git/branches", &[]).await
    }

    async fn detailed_status(&self) -> Result<DetailedGitStatus> {
        self.get_json("/git/status/detailed", &[]).await
    }

    async fn pull(&self, options: &PullOptions) -> Result<PullOutcome> {
        tracing::info!(
            stash = options.stash_changes,
            force = options.force,
            branch = options.branch.as_deref().unwrap_or("<current>"),
            "Requesting git pull"
        );

        let response = self
            .authorized(self.client.post(self.url("/git/pull")).json(options))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(error_from(response).await);
        }

        if status.is_success() {
            let body = response.json::<PullResponse>().await?;
            return Ok(PullOutcome::from(body));
        }

        // Non-2xx pull responses are pull failures, surfaced with any conflicts.
        let text = response.text().await.unwrap_or_default();
        let failure = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => PullFailure {
                message: body
                    .message()
                    .unwrap_or_else(|| format!("Pull failed with status {status}")),
                conflicts: body.conflicts.unwrap_or_default(),
                changes: Vec::new(),
            },
            Err(_) => PullFailure {
                message: if text.trim().is_empty() {
                    format!("Pull failed with status {status}")
                } else {
                    text
                },
                ..PullFailure::default()
            },
        };
        Ok(PullOutcome::Failed(failure))
    }

    async fn reload_dev(&self) -> Result<ReloadResponse> {
        tracing::info!("Requesting dev server reload");
        let response = self
            .authorized(self.client.post(self.url("/pm2/dev/reload")))
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json::<ReloadResponse>().await?)
    }

    async fn server_health(&self, env: Environment) -> Result<ServerHealth> {
        self.get_json("/health/server", &[("env", env.as_str())])
            .await
    }

    async fn env_git_status(&self, env: Environment) -> Result<EnvGitStatus> {
        self.get_json("/git/status", &[("env", env.as_str())]).await
    }

    async fn build_status(&self) -> Result<BuildStatus> {
        self.get_json("/build/status", &[]).await
    }

    async fn preview_pull(&self, env: Environment) -> Result<PullPreview> {
        self.get_json("/git/preview-pull", &[("env", env.as_str())])
            .await
    }
}
