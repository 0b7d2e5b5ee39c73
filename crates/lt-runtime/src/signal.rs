use tokio_util::sync::CancellationToken;

/// Wait for Ctrl-C (SIGINT) or SIGTERM, then cancel `cancel`.
///
/// Returns early without cancelling if `cancel` fires first, so callers can
/// spawn this alongside a session that may end on its own.
pub async fn wait_for_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to listen for SIGTERM");
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::signal::ctrl_c() => {
                lt_info!(sys, signal = "SIGINT", "received signal, stopping tail");
            }
            _ = sigterm.recv() => {
                lt_info!(sys, signal = "SIGTERM", "received signal, stopping tail");
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = cancel.cancelled() => return,
            result = tokio::signal::ctrl_c() => {
                result.expect("failed to listen for Ctrl-C");
                lt_info!(sys, "received shutdown signal, stopping tail");
            }
        }
    }
    cancel.cancel();
}
