//! Status panels, fetched once or polled on a fixed interval.
//!
//! Polling is independent of the pull workflow; a failing endpoint only
//! degrades its own panel.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::time::MissedTickBehavior;

use crate::api::types::{BuildStatus, DetailedGitStatus, EnvGitStatus, Environment, ServerHealth};
use crate::api::ConsoleApi;
use crate::error::Result;

#[derive(Debug, Clone)]
pub enum Panel<T> {
    Ready(T),
    Unavailable(String),
}

impl<T> Panel<T> {
    fn from_result(name: &str, result: Result<T>) -> Self {
        match result {
            Ok(value) => Panel::Ready(value),
            Err(e) => {
                tracing::warn!(panel = name, error = %e, "Status fetch failed");
                Panel::Unavailable(e.to_string())
            }
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Panel::Ready(value) => Some(value),
            Panel::Unavailable(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub env: Environment,
    pub taken_at: DateTime<Local>,
    pub working_tree: Panel<DetailedGitStatus>,
    pub health: Panel<ServerHealth>,
    pub env_git: Panel<EnvGitStatus>,
    pub build: Panel<BuildStatus>,
}

/// Fetch every panel concurrently.
pub async fn snapshot<A: ConsoleApi + ?Sized>(api: &A, env: Environment) -> Snapshot {
    let (working_tree, health, env_git, build) = tokio::join!(
        api.detailed_status(),
        api.server_health(env),
        api.env_git_status(env),
        api.build_status(),
    );

    Snapshot {
        env,
        taken_at: Local::now(),
        working_tree: Panel::from_result("working_tree", working_tree),
        health: Panel::from_result("health", health),
        env_git: Panel::from_result("env_git", env_git),
        build: Panel::from_result("build", build),
    }
}

/// Poll until `shutdown` resolves, handing each snapshot to `on_snapshot`.
/// The first snapshot is taken immediately. Returns the number taken.
pub async fn watch<A, F, S>(
    api: &A,
    env: Environment,
    interval: Duration,
    mut on_snapshot: F,
    shutdown: S,
) -> usize
where
    A: ConsoleApi + ?Sized,
    F: FnMut(&Snapshot),
    S: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    tracing::info!(env = %env, interval_secs = interval.as_secs(), "Watching console status");

    let mut taken = 0;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snap = snapshot(api, env).await;
                taken += 1;
                on_snapshot(&snap);
            }
            _ = &mut shutdown => {
                tracing::info!(snapshots = taken, "Stopped watching");
                break;
            }
        }
    }
    taken
}
