//! Signal handling for graceful shutdown.
//!
//! Both Kubernetes and Docker send SIGTERM first and SIGKILL after a grace
//! period, so the server treats SIGTERM exactly like Ctrl+C.

use log::info;

/// The type of shutdown signal received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGINT - user interrupt (Ctrl+C)
    Interrupt,
    /// SIGTERM - termination request (kill, Kubernetes, Docker)
    Terminate,
}

/// Wait for SIGINT or SIGTERM.
pub async fn shutdown_signal() -> ShutdownSignal {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            // Signal handler installation failed; never resolve this arm.
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal = tokio::select! {
        _ = ctrl_c => ShutdownSignal::Interrupt,
        _ = terminate => ShutdownSignal::Terminate,
    };
    info!("received {:?}, initiating graceful shutdown", signal);
    signal
}
