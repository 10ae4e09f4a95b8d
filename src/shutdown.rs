use tokio::signal;

use crate::api::ConsoleApi;
use crate::operator::{NoticeLevel, Operator};
use crate::workflow::PullSession;

/// Wait for a shutdown signal (SIGINT or SIGTERM).
pub async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown...");
        }
    }
}

/// Drop any restart the interrupted session still had scheduled.
pub fn graceful_shutdown<A, O>(session: &mut PullSession<A, O>)
where
    A: ConsoleApi + ?Sized,
    O: Operator,
{
    tracing::info!("Starting graceful shutdown...");

    let dropped = session.cancel_scheduled();
    if dropped == 0 {
        tracing::info!("No scheduled restarts to cancel");
        return;
    }

    session.operator().notify(
        NoticeLevel::Error,
        "Interrupted: the scheduled dev server restart was cancelled. Run `deckhand restart` if it is still needed.",
    );
    tracing::info!(cancelled = dropped, "Graceful shutdown complete");
}
