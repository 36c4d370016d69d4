pub mod cmd;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

pub use vinomap_c::util::init_logging;

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                (Err(e), _) | (_, Err(e)) => {
                    error!("Failed to install signal handlers: {}", e);
                    return std::future::pending().await;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully..."),
            _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully..."),
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            return std::future::pending().await;
        }
        info!("Received Ctrl-C, shutting down gracefully...");
    }
}
