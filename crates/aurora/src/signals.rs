//! Signal handling for graceful server shutdown.
//!
//! The first SIGINT/SIGTERM starts a graceful shutdown; a second one
//! terminates the process (see `Application::run`).

use aurora_core::ShutdownState;
use tokio::signal;
use tracing::info;

/// Waits for a termination signal and initiates `shutdown_state`.
pub async fn setup_signal_handlers(shutdown_state: &ShutdownState) -> Result<(), Box<dyn std::error::Error>> {
    wait_for_signal().await?;
    info!("📡 Received shutdown signal - initiating graceful shutdown");
    shutdown_state.initiate_shutdown();
    Ok(())
}

/// Resolves on SIGINT or SIGTERM (Ctrl+C on Windows) without logging.
pub async fn wait_for_signal() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => (),
            _ = sigterm.recv() => ()
        }
    }

    #[cfg(windows)]
    signal::ctrl_c().await?;

    Ok(())
}
