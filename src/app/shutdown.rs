use std::time::Duration;
use tokio::signal;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal as unix_signal};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Time allowed for the sink to drain and close its file once shutdown starts.
///
/// Fits within Docker's default stop grace period.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(4);

/// Cancels `token` on SIGINT or, on unix, SIGTERM.
pub fn spawn_signal_listener(token: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut sigterm = match unix_signal(SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    wait_for_ctrl_c(&token).await;
                    return;
                }
            };

            tokio::select! {
                () = wait_for_ctrl_c(&token) => {}
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, initiating graceful shutdown");
                    token.cancel();
                }
                () = token.cancelled() => {}
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                () = wait_for_ctrl_c(&token) => {}
                () = token.cancelled() => {}
            }
        }
    });
}

async fn wait_for_ctrl_c(token: &CancellationToken) {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
            token.cancel();
        }
        Err(e) => {
            error!("Failed to listen for SIGINT: {}", e);
            // Without a signal source only end of input stops the process.
            std::future::pending::<()>().await;
        }
    }
}

