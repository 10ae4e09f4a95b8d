use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use deckhand::api::types::{Environment, PullOptions};
use deckhand::api::{ConsoleApi, HttpConsoleApi};
use deckhand::config::AppConfig;
use deckhand::operator::TerminalOperator;
use deckhand::shutdown::{graceful_shutdown, wait_for_shutdown};
use deckhand::workflow::{PullOutcome, PullSession, RestartDelays};
use deckhand::{monitor, report};

#[derive(Parser)]
#[command(name = "deckhand", about = "Operator CLI for the deployment console")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Pull the dev checkout and run the post-pull workflow
    Pull {
        /// Do not stash local changes before pulling
        #[arg(long)]
        no_stash: bool,
        /// Delete local changes before pulling
        #[arg(long)]
        force: bool,
        /// Pull a specific branch (defaults to the current branch when no name is given)
        #[arg(long, num_args = 0..=1, default_missing_value = "", value_name = "BRANCH")]
        branch: Option<String>,
        /// Acknowledge dialogs without waiting for Enter
        #[arg(short, long)]
        yes: bool,
    },
    /// Restart the dev server now
    Restart,
    /// List local and remote branches
    Branches,
    /// Show what a pull would bring in
    Preview {
        #[arg(long, value_enum)]
        env: Option<Environment>,
    },
    /// Print the status panels once
    Status {
        #[arg(long, value_enum)]
        env: Option<Environment>,
    },
    /// Poll the status panels until interrupted
    Watch {
        #[arg(long, value_enum)]
        env: Option<Environment>,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = AppConfig::load(cli.config.as_deref())?;
    tracing::debug!(config = ?config, "Loaded configuration");

    let api = Arc::new(HttpConsoleApi::new(&config)?);

    match cli.command {
        Command::Pull {
            no_stash,
            force,
            branch,
            yes,
        } => {
            let branch = match branch {
                Some(name) if name.is_empty() => Some(
                    api.branches()
                        .await?
                        .current
                        .context("console did not report a current branch")?,
                ),
                other => other,
            };
            let options = PullOptions {
                stash_changes: config.pull.stash_changes && !no_stash,
                force: config.pull.force || force,
                branch,
            };
            run_pull(api, &config, options, yes).await
        }
        Command::Restart => {
            let mut session = PullSession::new(
                api,
                TerminalOperator::new(true),
                RestartDelays::from(&config.workflow),
            );
            session.request_restart().await?;
            if session.restart_failures() > 0 {
                anyhow::bail!("dev server restart failed");
            }
            Ok(())
        }
        Command::Branches => {
            print!("{}", report::render_branches(&api.branches().await?));
            Ok(())
        }
        Command::Preview { env } => {
            let env = env.unwrap_or(config.monitor.env);
            print!("{}", report::render_preview(&api.preview_pull(env).await?));
            Ok(())
        }
        Command::Status { env } => {
            let env = env.unwrap_or(config.monitor.env);
            let snap = monitor::snapshot(api.as_ref(), env).await;
            print!("{}", report::render_snapshot(&snap));
            Ok(())
        }
        Command::Watch { env } => {
            let env = env.unwrap_or(config.monitor.env);
            monitor::watch(
                api.as_ref(),
                env,
                config.poll_interval(),
                |snap| println!("{}", report::render_snapshot(snap)),
                wait_for_shutdown(),
            )
            .await;
            Ok(())
        }
    }
}

async fn run_pull(
    api: Arc<HttpConsoleApi>,
    config: &AppConfig,
    options: PullOptions,
    auto_acknowledge: bool,
) -> anyhow::Result<()> {
    let mut session = PullSession::new(
        api,
        TerminalOperator::new(auto_acknowledge),
        RestartDelays::from(&config.workflow),
    );

    let finished = tokio::select! {
        result = async {
            let outcome = session.pull(&options).await?;
            session.settle().await?;
            Ok::<_, deckhand::error::AppError>(outcome)
        } => Some(result?),
        _ = wait_for_shutdown() => None,
    };

    let Some(outcome) = finished else {
        graceful_shutdown(&mut session);
        anyhow::bail!("interrupted");
    };

    if let PullOutcome::Failed(_) = outcome {
        anyhow::bail!("pull failed");
    }
    if session.restart_failures() > 0 {
        anyhow::bail!("pull succeeded but the dev server restart failed");
    }
    Ok(())
}
