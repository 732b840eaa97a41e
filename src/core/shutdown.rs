//! # Termination signals.
//!
//! [`wait_for_shutdown_signal`] backs [`Supervisor::run_until_signal`](crate::Supervisor::run_until_signal).
//!
//! - Unix: `SIGINT`, `SIGTERM`, `SIGQUIT`
//! - elsewhere: Ctrl-C

/// Completes on the first termination signal.
///
/// Returns `Err` if a signal listener cannot be installed.
#[cfg(unix)]
pub(crate) async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = interrupt.recv() => {},
        _ = terminate.recv() => {},
        _ = quit.recv() => {},
    }
    Ok(())
}

/// Completes on Ctrl-C.
#[cfg(not(unix))]
pub(crate) async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
